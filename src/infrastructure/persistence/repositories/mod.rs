pub mod cash;
pub mod cash_flow;
pub mod dismissed_filter;
pub mod evaluation;
pub mod fx_rate;
pub mod group_target;
pub mod job;
pub mod plan;
pub mod position;
pub mod price_bar;
pub mod security;
pub mod sequence;
pub mod trade;
