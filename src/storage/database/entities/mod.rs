/// Budget counter entity module
pub mod budget_counter;
/// Usage record entity module
pub mod usage_record;

pub use budget_counter::Entity as BudgetCounter;
pub use usage_record::Entity as UsageRecord;
