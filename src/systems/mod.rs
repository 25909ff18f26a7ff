mod clock;
mod disaster;
mod economy;
mod flight;
mod traffic;

pub use clock::ClockSystem;
pub use disaster::DisasterSystem;
pub use economy::EconomySystem;
pub use flight::FlightSystem;
pub use traffic::TrafficSystem;
