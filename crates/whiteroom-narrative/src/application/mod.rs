pub mod audit_handlers;
pub mod command_handlers;
pub mod query_handlers;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_doubles;
