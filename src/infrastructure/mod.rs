// Infrastructure adapters for cel-fixtures.

pub mod cel_bridge;
pub mod exporter;
pub mod go_source;
pub mod module_cache;

pub use cel_bridge::{CelParserBridge, DebugStringRenderer};
pub use exporter::{FileExporter, WireFormat};
pub use go_source::{parse_go_source, SourceError};
pub use module_cache::{ModuleCacheConfig, ModuleCacheResolver, DEFAULT_MODULE};
