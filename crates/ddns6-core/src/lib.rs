// # ddns6-core
//
// Core library for the IPv6 dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping one AAAA record
// in sync with the public IPv6 address of one interface:
// - **IpSource**: Trait for reading the public IPv6 address of an interface
// - **probe**: Address classification and public-address selection
// - **DnsProvider**: Trait for looking up and writing the record
// - **Debouncer**: State machine holding back unstable addresses
// - **DdnsEngine**: Poll driver tying the above together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from platform and provider code
// 2. **Debounced**: Only an address that held for the stability window is published
// 3. **Single owner**: Poll ticks and timer expiries are serialized on one task
// 4. **Library-First**: All core functionality can be used as a library
// 5. **No persistence**: State is rebuilt from the provider at every start

pub mod traits;
pub mod engine;
pub mod probe;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, ExistingRecord, RecordId, RecordSpec};
pub use engine::{DdnsEngine, EngineEvent};
pub use engine::debounce::Debouncer;
pub use config::{DdnsConfig, ProviderConfig};
pub use error::{Error, Result};
