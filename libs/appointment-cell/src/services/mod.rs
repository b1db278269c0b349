pub mod booking;
pub mod clock;
pub mod planner;
pub mod store;
pub mod supabase_store;

pub use booking::SlotBookingService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use planner::{compute_available_slots, SlotPlanner, PLANNING_DAYS};
pub use store::{BookingStore, InMemoryBookingStore};
pub use supabase_store::SupabaseBookingStore;
