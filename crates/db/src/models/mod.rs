pub mod queue_event;
pub mod workspace;
pub mod workspace_record;

#[cfg(test)]
pub(crate) mod test_utils;
