mod link_record;
pub(crate) mod snowflake;

pub use link_record::LinkRecord;
