pub mod entitlement;
pub mod evaluator;
pub mod patterns;
pub mod risk;
