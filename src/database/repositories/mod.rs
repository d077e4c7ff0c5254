/// Repository pattern implementations adhering to SOLID principles
///
/// - **Single Responsibility**: Each repository handles one entity type
/// - **Open/Closed**: Easy to extend with new implementations
/// - **Liskov Substitution**: Traits define contracts
/// - **Interface Segregation**: Focused repository interfaces
/// - **Dependency Inversion**: Depend on traits, not concrete types
pub mod availability_repository;
pub mod candle_repository;
pub mod symbol_repository;

pub use availability_repository::{AvailabilityRepository, PgAvailabilityRepository, TickRangeSummary};
pub use candle_repository::{CandleRepository, PgCandleRepository};
pub use symbol_repository::{PgSymbolRepository, SymbolRepository};
