use serde::Deserialize;
use serde::Serialize;

/// A map of export names to the corresponding local variable names
#[derive(Clone, Debug, Default, Deserialize, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
  /// The IMPORTED name. Most of the time this is the mangled symbol
  pub local: String,

  /// The original EXPORTED name
  pub exported: String,

  /// The location of the symbol within the source file
  #[serde(default)]
  pub loc: Option<SourceLocation>,

  /// Whether the symbol is only re-exported, meaning it is not used by the asset itself
  ///
  /// A weak symbol does not force its target to be included in the output on its own.
  ///
  pub is_weak: bool,

  /// Whether the symbol is an ES module export
  pub is_esm_export: bool,

  /// Whether the asset references its own export
  pub self_referenced: bool,
}

impl Symbol {
  pub fn new(local: impl Into<String>, exported: impl Into<String>, is_weak: bool) -> Self {
    Symbol {
      local: local.into(),
      exported: exported.into(),
      is_weak,
      ..Symbol::default()
    }
  }
}

/// Looks up a symbol by its exported name
pub fn find_symbol<'a>(symbols: &'a [Symbol], exported: &str) -> Option<&'a Symbol> {
  symbols.iter().find(|s| s.exported == exported)
}

/// A position within a source file
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
  pub file_path: std::path::PathBuf,
  pub start: Location,
  pub end: Location,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Location {
  pub line: u32,
  pub column: u32,
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn symbols_keep_their_source_location() -> anyhow::Result<()> {
    let symbol = Symbol {
      loc: Some(SourceLocation {
        file_path: std::path::PathBuf::from("index.js"),
        start: Location { line: 1, column: 0 },
        end: Location { line: 1, column: 8 },
      }),
      ..Symbol::new("$index$a", "a", false)
    };

    let restored: Symbol = serde_json::from_str(&serde_json::to_string(&symbol)?)?;
    assert_eq!(restored, symbol);
    assert_eq!(find_symbol(&[symbol.clone()], "a"), Some(&symbol));
    assert_eq!(find_symbol(&[symbol], "b"), None);
    Ok(())
  }
}
