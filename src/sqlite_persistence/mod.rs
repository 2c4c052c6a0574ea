mod versioned_schema;

pub use versioned_schema::{
    register_collations, Collation, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table,
    VersionedSchema, BASE_DB_VERSION,
};
