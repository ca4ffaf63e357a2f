//! Go module cache resolution
//!
//! Finds the version of the reference module pinned in a `go.mod`, locates
//! that version in the local module cache and parses the requested file.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

use crate::infrastructure::go_source::parse_go_source;
use crate::ports::{ResolvedSource, SourceResolver};

pub const DEFAULT_MODULE: &str = "github.com/google/cel-go";

/// Where the module cache lives.
#[derive(Debug, Clone, Default)]
pub struct ModuleCacheConfig {
    pub gomodcache: Option<PathBuf>,
    pub gopath: Option<String>,
}

impl ModuleCacheConfig {
    /// Read `GOMODCACHE` and `GOPATH`; empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            gomodcache: env::var_os("GOMODCACHE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            gopath: env::var("GOPATH").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        Self {
            gomodcache: Some(root.into()),
            gopath: None,
        }
    }

    pub fn cache_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.gomodcache {
            return Ok(root.clone());
        }
        let first_gopath = self
            .gopath
            .as_deref()
            .and_then(|gopath| env::split_paths(gopath).next())
            .filter(|p| !p.as_os_str().is_empty());
        match first_gopath {
            Some(gopath) => Ok(gopath.join("pkg").join("mod")),
            None => bail!("cannot resolve go module cache, GOPATH and GOMODCACHE empty"),
        }
    }
}

pub struct ModuleCacheResolver {
    manifest: PathBuf,
    module: String,
    config: ModuleCacheConfig,
}

impl ModuleCacheResolver {
    pub fn new(manifest: impl Into<PathBuf>, module: impl Into<String>, config: ModuleCacheConfig) -> Self {
        Self {
            manifest: manifest.into(),
            module: module.into(),
            config,
        }
    }

    /// Directory of the pinned module version inside the cache.
    pub fn module_dir(&self) -> Result<(PathBuf, String)> {
        let go_mod = fs::read_to_string(&self.manifest)
            .with_context(|| format!("failed to read go.mod {}", self.manifest.display()))?;
        let version = required_version(&go_mod, &self.module)
            .ok_or_else(|| anyhow!("{} not in go.mod", self.module))?;
        let root = self.config.cache_root()?;
        let dir = root.join(format!(
            "{}@{}",
            escape_path(&self.module),
            escape_path(&version)
        ));
        debug!(module = %self.module, %version, dir = %dir.display(), "Resolved module cache directory");
        if !dir.is_dir() {
            bail!(
                "cannot resolve {} {} in go module cache: {} is not a directory",
                self.module,
                version,
                dir.display()
            );
        }
        Ok((dir, version))
    }
}

impl SourceResolver for ModuleCacheResolver {
    fn resolve(&self, relative_path: &str) -> Result<ResolvedSource> {
        let (dir, version) = self.module_dir()?;
        let path = dir.join(relative_path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot resolve {} in {}", relative_path, dir.display()))?;
        let file = parse_go_source(relative_path, &text)?;
        info!(path = %path.display(), decls = file.decls.len(), "Parsed reference source");
        Ok(ResolvedSource {
            file,
            provenance: format!("{}@{}/{}", self.module, version, relative_path),
        })
    }
}

/// Version of `module` in the `require` directives of a `go.mod`.
pub fn required_version(go_mod: &str, module: &str) -> Option<String> {
    let mut in_block = false;
    for line in go_mod.lines() {
        let line = match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        }
        .trim();
        let entry = if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            line
        } else if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim_start();
            if let Some(block) = rest.strip_prefix('(') {
                in_block = true;
                block.trim()
            } else {
                rest
            }
        } else {
            continue;
        };
        let mut fields = entry.split_whitespace();
        if fields.next() == Some(module) {
            if let Some(version) = fields.next() {
                return Some(version.to_string());
            }
        }
    }
    None
}

/// Case-encode a module path or version for the cache layout: every upper
/// case letter becomes `!` followed by its lower case form.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_MOD: &str = "module github.com/example/conformance

go 1.22

require (
	github.com/google/cel-go v0.22.2-0.20241217215216-98789f34a481 // pinned
	google.golang.org/protobuf v1.36.0
)

require github.com/BurntSushi/toml v1.4.0
";

    #[test]
    fn test_required_version_in_block_and_line() {
        assert_eq!(
            required_version(GO_MOD, DEFAULT_MODULE).as_deref(),
            Some("v0.22.2-0.20241217215216-98789f34a481")
        );
        assert_eq!(
            required_version(GO_MOD, "github.com/BurntSushi/toml").as_deref(),
            Some("v1.4.0")
        );
        assert_eq!(required_version(GO_MOD, "github.com/google/cel-spec"), None);
    }

    #[test]
    fn test_module_line_is_not_a_requirement() {
        let go_mod = "module github.com/google/cel-go\n\ngo 1.22\n";
        assert_eq!(required_version(go_mod, DEFAULT_MODULE), None);
    }

    #[test]
    fn test_escape_path_lowers_capitals() {
        assert_eq!(escape_path("github.com/BurntSushi/toml"), "github.com/!burnt!sushi/toml");
        assert_eq!(escape_path("v1.0.0-RC1"), "v1.0.0-!r!c1");
    }

    #[test]
    fn test_cache_root_precedence() {
        let both = ModuleCacheConfig {
            gomodcache: Some(PathBuf::from("/cache")),
            gopath: Some("/go".into()),
        };
        assert_eq!(both.cache_root().unwrap(), PathBuf::from("/cache"));

        let gopath_only = ModuleCacheConfig {
            gomodcache: None,
            gopath: Some("/go".into()),
        };
        assert_eq!(gopath_only.cache_root().unwrap(), PathBuf::from("/go/pkg/mod"));

        let err = ModuleCacheConfig::default().cache_root().unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot resolve go module cache, GOPATH and GOMODCACHE empty"
        );
    }
}
