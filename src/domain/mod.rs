//! Domain layer - geo lookups, travel pricing and recalculation

pub mod cache;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod geo;
pub mod pricing;
pub mod recalculation;
pub mod travel;

pub use cache::{
    CacheEntry, CacheKey, CacheNamespace, CacheStats, CacheTier, CleanupReport, PurgeOutcome,
    TierBreakdown, TierCleanup, TierKind,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{ApiKeyProvider, GOOGLE_MAPS_SERVICE};
pub use error::DomainError;
pub use geo::{
    Address, Coordinates, DistanceKey, DistanceResult, GeoKey, GeoLookupClient, GeoLookupError,
    GeocodeResult, StructuredAddress, TravelMode, Waypoint,
};
pub use pricing::{
    CostBreakdown, CostConditions, Money, PricingProfile, Supplement, SupplementKind,
    TieredRange, TravelCostCalculator,
};
pub use recalculation::{
    ItemError, RecalcReport, RecalcRun, RecalcRunId, RecalcRunRepository, RecalcState,
    RecalcTrigger,
};
pub use travel::{
    AddressFields, ProfessionalRecord, RequestStatus, ServiceRequestRecord, TravelError,
    TravelInfo, TravelRepository,
};
