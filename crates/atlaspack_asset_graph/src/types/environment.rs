use std::collections::BTreeMap;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::hash::IdentifierHasher;

pub type EnvironmentRef = Arc<Environment>;

/// The environment the built code will run in
///
/// This influences how Atlaspack compiles your code, including what syntax to transpile.
///
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
  /// The environment the output should run in
  pub context: EnvironmentContext,

  /// Describes which node_modules should be included in the output
  pub include_node_modules: IncludeNodeModules,

  /// Whether this is a library build
  ///
  /// Treats the target as a library that would be published to npm and consumed by another tool,
  /// rather than used directly in a browser or other target environment. Every export of a
  /// library entry is considered used.
  ///
  pub is_library: bool,

  /// Determines what type of module to output
  pub output_format: OutputFormat,

  /// Determines whether scope hoisting should be enabled
  pub should_scope_hoist: bool,

  /// Determines whether the output should be optimised
  pub should_optimize: bool,

  pub source_type: SourceType,
}

impl Environment {
  pub fn id(&self) -> String {
    let mut hasher = IdentifierHasher::new();
    self.context.hash(&mut hasher);
    self.include_node_modules.hash(&mut hasher);
    self.output_format.hash(&mut hasher);
    self.source_type.hash(&mut hasher);
    self.is_library.hash(&mut hasher);
    self.should_optimize.hash(&mut hasher);
    self.should_scope_hoist.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
  }
}

/// The environment the output should run in
///
/// This informs Atlaspack what environment-specific APIs are available.
///
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentContext {
  #[default]
  Browser,
  ElectronMain,
  ElectronRenderer,
  Node,
  ServiceWorker,
  WebWorker,
  Worklet,
}

impl EnvironmentContext {
  pub fn is_node(&self) -> bool {
    use EnvironmentContext::*;
    matches!(self, Node | ElectronMain | ElectronRenderer)
  }

  pub fn is_browser(&self) -> bool {
    use EnvironmentContext::*;
    matches!(
      self,
      Browser | WebWorker | ServiceWorker | Worklet | ElectronRenderer
    )
  }

  pub fn is_worker(&self) -> bool {
    use EnvironmentContext::*;
    matches!(self, WebWorker | ServiceWorker)
  }
}

impl Display for EnvironmentContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      EnvironmentContext::Browser => "browser",
      EnvironmentContext::ElectronMain => "electron-main",
      EnvironmentContext::ElectronRenderer => "electron-renderer",
      EnvironmentContext::Node => "node",
      EnvironmentContext::ServiceWorker => "service-worker",
      EnvironmentContext::WebWorker => "web-worker",
      EnvironmentContext::Worklet => "worklet",
    };

    write!(f, "{name}")
  }
}

#[derive(Clone, Debug, Deserialize, Hash, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IncludeNodeModules {
  Bool(bool),
  Array(Vec<String>),
  // We can't hash a HashMap because we need to iterate in order
  Map(BTreeMap<String, bool>),
}

impl Default for IncludeNodeModules {
  fn default() -> Self {
    IncludeNodeModules::Bool(true)
  }
}

impl From<EnvironmentContext> for IncludeNodeModules {
  fn from(context: EnvironmentContext) -> Self {
    match context {
      EnvironmentContext::Browser => IncludeNodeModules::Bool(true),
      EnvironmentContext::ServiceWorker => IncludeNodeModules::Bool(true),
      EnvironmentContext::WebWorker => IncludeNodeModules::Bool(true),
      _ => IncludeNodeModules::Bool(false),
    }
  }
}

/// The type of module the output is written as
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  #[default]
  Global,
  #[serde(rename = "commonjs")]
  CommonJS,
  EsModule,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SourceType {
  #[default]
  #[serde(rename = "module")]
  Module,
  #[serde(rename = "script")]
  Script,
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn equal_environments_share_an_id() {
    let a = Environment::default();
    let b = Environment::default();

    assert_eq!(a.id(), b.id());
    assert_eq!(a.id().len(), 16);
  }

  #[test]
  fn id_changes_with_the_target_shape() {
    let browser = Environment::default();
    let node = Environment {
      context: EnvironmentContext::Node,
      include_node_modules: IncludeNodeModules::from(EnvironmentContext::Node),
      output_format: OutputFormat::CommonJS,
      ..Environment::default()
    };
    let library = Environment {
      is_library: true,
      ..Environment::default()
    };

    assert_ne!(browser.id(), node.id());
    assert_ne!(browser.id(), library.id());
  }

  #[test]
  fn context_displays_as_kebab_case() -> anyhow::Result<()> {
    assert_eq!(EnvironmentContext::WebWorker.to_string(), "web-worker");
    assert_eq!(
      serde_json::to_string(&EnvironmentContext::ElectronMain)?,
      "\"electron-main\""
    );
    Ok(())
  }
}
