pub mod calendar;
pub mod fundamentals;
pub mod fx;
pub mod mock_broker;
pub mod price;
