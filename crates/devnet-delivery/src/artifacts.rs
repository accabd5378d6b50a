//! Compiled contract artifacts and source constants.
//!
//! Contracts are compiled by `scarb` outside the harness; this module only
//! locates and reads what the build left in `target/<profile>/`.

use crate::DeliveryError;
use devnet_types::{parse_felt, CompiledClass, Felt, SierraClass};
use regex::Regex;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_TARGET: &str = "release";

/// Build output of one Scarb package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifacts {
	folder: PathBuf,
	package: String,
	target: String,
}

impl ContractArtifacts {
	/// Artifacts of `package` under `folder`, using the `release` profile.
	pub fn new(folder: impl Into<PathBuf>, package: impl Into<String>) -> Self {
		Self {
			folder: folder.into(),
			package: package.into(),
			target: DEFAULT_TARGET.to_string(),
		}
	}

	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = target.into();
		self
	}

	fn target_dir(&self) -> PathBuf {
		self.folder.join("target").join(&self.target)
	}

	fn file_name(&self, contract_name: &str, suffix: &str) -> String {
		format!("{}_{}.{}.json", self.package, contract_name, suffix)
	}

	/// Path of the Sierra class file of `contract_name`.
	pub fn contract_class_path(&self, contract_name: &str) -> PathBuf {
		self.target_dir()
			.join(self.file_name(contract_name, "contract_class"))
	}

	/// Path of the CASM file of `contract_name`.
	pub fn compiled_class_path(&self, contract_name: &str) -> PathBuf {
		self.target_dir()
			.join(self.file_name(contract_name, "compiled_contract_class"))
	}

	pub async fn contract_class(&self, contract_name: &str) -> Result<Value, DeliveryError> {
		let file_name = self.file_name(contract_name, "contract_class");
		let hint = "Please run `scarb build` first.";
		self.read_json(&file_name, hint).await
	}

	pub async fn compiled_contract_class(&self, contract_name: &str) -> Result<Value, DeliveryError> {
		let file_name = self.file_name(contract_name, "compiled_contract_class");
		let hint = "Make sure casm = true in the [[target.starknet-contract]] section of \
			Scarb.toml and then run `scarb build`.";
		self.read_json(&file_name, hint).await
	}

	/// Reads the Sierra class of `contract_name` in the form a declare sends.
	///
	/// An ABI stored as a JSON array is serialized to a compact string, and
	/// that string is what the class hash covers.
	pub async fn sierra_class(&self, contract_name: &str) -> Result<SierraClass, DeliveryError> {
		let mut class = self.contract_class(contract_name).await?;
		if let Some(abi) = class.get_mut("abi") {
			if !abi.is_string() {
				*abi = Value::String(abi.to_string());
			}
		}
		serde_json::from_value(class).map_err(|e| {
			DeliveryError::InvalidArtifact(format!(
				"{}: {}",
				self.file_name(contract_name, "contract_class"),
				e
			))
		})
	}

	/// Reads the CASM of `contract_name`.
	pub async fn compiled_class(&self, contract_name: &str) -> Result<CompiledClass, DeliveryError> {
		let class = self.compiled_contract_class(contract_name).await?;
		serde_json::from_value(class).map_err(|e| {
			DeliveryError::InvalidArtifact(format!(
				"{}: {}",
				self.file_name(contract_name, "compiled_contract_class"),
				e
			))
		})
	}

	/// Reads the ABI out of the contract class file.
	///
	/// Older class files store the ABI as a JSON string; it is decoded so the
	/// result is always the ABI array.
	pub async fn abi(&self, contract_name: &str) -> Result<Value, DeliveryError> {
		let class = self.contract_class(contract_name).await?;
		match class.get("abi") {
			Some(Value::String(abi)) => serde_json::from_str(abi).map_err(|e| {
				DeliveryError::InvalidArtifact(format!("ABI of {}: {}", contract_name, e))
			}),
			Some(abi) => Ok(abi.clone()),
			None => Err(DeliveryError::InvalidArtifact(format!(
				"{} has no abi",
				self.file_name(contract_name, "contract_class")
			))),
		}
	}

	async fn read_json(&self, file_name: &str, hint: &str) -> Result<Value, DeliveryError> {
		let path = self.target_dir().join(file_name);
		let content = match tokio::fs::read_to_string(&path).await {
			Ok(content) => content,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(DeliveryError::ArtifactMissing(format!(
					"{} file not found in {}. {}",
					file_name,
					self.target_dir().display(),
					hint
				)));
			},
			Err(e) => {
				return Err(DeliveryError::InvalidArtifact(format!(
					"{}: {}",
					path.display(),
					e
				)));
			},
		};
		serde_json::from_str(&content)
			.map_err(|e| DeliveryError::InvalidArtifact(format!("{}: {}", path.display(), e)))
	}
}

/// Extracts an integer constant `pub const NAME: type = value;` from Cairo
/// source.
///
/// The value may be hex or decimal, with `_` separators, a `_u<N>` type
/// suffix and a trailing `.try_into().unwrap()`. Declarations split over
/// several lines are accepted.
pub fn cairo_int_constant(source: &str, name: &str) -> Result<Felt, DeliveryError> {
	let joined = source.replace("\\\n", "");
	let joined = Regex::new(r"\s*\n\s*")
		.map_err(|e| DeliveryError::InvalidArgument(e.to_string()))?
		.replace_all(&joined, " ");

	let pattern = format!(
		r"(?x)
		pub\s+const\s+{}
		\s*:\s*\w+
		\s*=\s*
		(?P<val>0x[0-9a-fA-F_]+|[0-9_]+)
		(_[uU]\d+)?
		(\s*\.\s*try_into\(\)\s*\.\s*unwrap\(\))?
		\s*;",
		regex::escape(name)
	);
	let re = Regex::new(&pattern).map_err(|e| DeliveryError::InvalidArgument(e.to_string()))?;

	let raw = re
		.captures(&joined)
		.and_then(|captures| captures.name("val"))
		.ok_or_else(|| DeliveryError::InvalidArtifact(format!("Constant '{}' not found", name)))?
		.as_str()
		.replace('_', "");
	parse_felt(&raw)
		.map_err(|e| DeliveryError::InvalidArtifact(format!("Constant '{}': {}", name, e)))
}

/// Reads `path` and extracts the constant `name` from it.
pub async fn cairo_int_constant_from_file(
	path: impl AsRef<Path>,
	name: &str,
) -> Result<Felt, DeliveryError> {
	let path = path.as_ref();
	let source = tokio::fs::read_to_string(path).await.map_err(|e| {
		DeliveryError::ArtifactMissing(format!("{}: {}", path.display(), e))
	})?;
	cairo_int_constant(&source, name).map_err(|e| match e {
		DeliveryError::InvalidArtifact(message) => {
			DeliveryError::InvalidArtifact(format!("{} in {}", message, path.display()))
		},
		other => other,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const SOURCE: &str = r#"
pub const DECIMALS: u8 = 18;
pub const MAX_SUPPLY: u256 = 1_000_000_000_000_000_000_u256;
pub const ROLE: felt252 = 0x1f_a2;
pub const FEE_CAP: u128 =
    0xffff
        .try_into()
        .unwrap();
pub const DECIMALS_V2: u8 = 6;
"#;

	#[test]
	fn test_cairo_constants() {
		assert_eq!(cairo_int_constant(SOURCE, "DECIMALS").unwrap(), Felt::from(18u64));
		assert_eq!(
			cairo_int_constant(SOURCE, "MAX_SUPPLY").unwrap(),
			Felt::from(1_000_000_000_000_000_000u64)
		);
		assert_eq!(cairo_int_constant(SOURCE, "ROLE").unwrap(), Felt::from(0x1fa2u64));
		assert_eq!(cairo_int_constant(SOURCE, "FEE_CAP").unwrap(), Felt::from(0xffffu64));
		assert_eq!(cairo_int_constant(SOURCE, "DECIMALS_V2").unwrap(), Felt::from(6u64));
	}

	#[test]
	fn test_cairo_constant_missing() {
		let err = cairo_int_constant(SOURCE, "DECIMAL").unwrap_err();
		assert!(matches!(err, DeliveryError::InvalidArtifact(ref m) if m == "Constant 'DECIMAL' not found"));
	}

	#[tokio::test]
	async fn test_cairo_constant_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("constants.cairo");
		std::fs::write(&path, SOURCE).unwrap();

		let value = cairo_int_constant_from_file(&path, "DECIMALS").await.unwrap();
		assert_eq!(value, Felt::from(18u64));

		let err = cairo_int_constant_from_file(&path, "MISSING").await.unwrap_err();
		assert!(err.to_string().contains("constants.cairo"));
	}

	#[test]
	fn test_artifact_paths() {
		let artifacts = ContractArtifacts::new("/work/token", "token");
		assert_eq!(
			artifacts.contract_class_path("ERC20"),
			PathBuf::from("/work/token/target/release/token_ERC20.contract_class.json")
		);
		assert_eq!(
			artifacts.with_target("dev").compiled_class_path("ERC20"),
			PathBuf::from("/work/token/target/dev/token_ERC20.compiled_contract_class.json")
		);
	}

	#[tokio::test]
	async fn test_abi_from_class_file() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("target").join("release");
		std::fs::create_dir_all(&target).unwrap();
		let abi = json!([{ "type": "function", "name": "balance_of" }]);
		std::fs::write(
			target.join("token_ERC20.contract_class.json"),
			json!({ "sierra_program": [], "abi": abi.clone() }).to_string(),
		)
		.unwrap();
		std::fs::write(
			target.join("token_Legacy.contract_class.json"),
			json!({ "abi": abi.to_string() }).to_string(),
		)
		.unwrap();

		let artifacts = ContractArtifacts::new(dir.path(), "token");
		assert_eq!(artifacts.abi("ERC20").await.unwrap(), abi);
		assert_eq!(artifacts.abi("Legacy").await.unwrap(), abi);
	}

	#[tokio::test]
	async fn test_classes_for_declaration() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("target").join("release");
		std::fs::create_dir_all(&target).unwrap();
		let abi = json!([{ "type": "function", "name": "balance_of" }]);
		std::fs::write(
			target.join("token_ERC20.contract_class.json"),
			json!({
				"sierra_program": ["0x1", "0x2"],
				"sierra_program_debug_info": {},
				"contract_class_version": "0.1.0",
				"entry_points_by_type": { "EXTERNAL": [], "L1_HANDLER": [], "CONSTRUCTOR": [] },
				"abi": abi.clone()
			})
			.to_string(),
		)
		.unwrap();
		std::fs::write(
			target.join("token_ERC20.compiled_contract_class.json"),
			json!({
				"prime": "0x800000000000011000000000000000000000000000000000000000000000001",
				"bytecode": ["0x1", "0x2", "0x3"],
				"bytecode_segment_lengths": [3],
				"hints": [],
				"entry_points_by_type": { "EXTERNAL": [], "L1_HANDLER": [], "CONSTRUCTOR": [] }
			})
			.to_string(),
		)
		.unwrap();

		let artifacts = ContractArtifacts::new(dir.path(), "token");
		let sierra = artifacts.sierra_class("ERC20").await.unwrap();
		assert_eq!(sierra.abi, abi.to_string());
		assert_eq!(sierra.sierra_program, vec![Felt::ONE, Felt::from(2u64)]);

		let casm = artifacts.compiled_class("ERC20").await.unwrap();
		assert_eq!(casm.bytecode.len(), 3);
		assert!(casm.compiled_class_hash().is_ok());
	}

	#[tokio::test]
	async fn test_class_without_program_is_invalid() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("target").join("release");
		std::fs::create_dir_all(&target).unwrap();
		std::fs::write(
			target.join("token_ERC20.contract_class.json"),
			json!({ "abi": [] }).to_string(),
		)
		.unwrap();

		let err = ContractArtifacts::new(dir.path(), "token")
			.sierra_class("ERC20")
			.await
			.unwrap_err();
		assert!(matches!(err, DeliveryError::InvalidArtifact(ref m) if m.starts_with("token_ERC20.contract_class.json")));
	}

	#[tokio::test]
	async fn test_missing_artifact_mentions_build() {
		let dir = tempfile::tempdir().unwrap();
		let artifacts = ContractArtifacts::new(dir.path(), "token");

		let err = artifacts.abi("ERC20").await.unwrap_err();
		assert!(matches!(err, DeliveryError::ArtifactMissing(_)));
		let message = err.to_string();
		assert!(message.starts_with("token_ERC20.contract_class.json file not found in"));
		assert!(message.ends_with("Please run `scarb build` first."));

		let err = artifacts.compiled_contract_class("ERC20").await.unwrap_err();
		assert!(err.to_string().contains("casm = true"));
	}
}
