mod avg_price;
mod listing;
mod price_observation;

pub use avg_price::AvgPrice;
pub use listing::Listing;
pub use price_observation::PriceObservation;
