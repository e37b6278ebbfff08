use std::sync::Arc;

use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::store::TableStore;

/// Table-level administration: existence checks, creation, listing.
#[derive(Clone)]
pub struct Admin {
    store: Arc<dyn TableStore>,
}

impl std::fmt::Debug for Admin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admin").finish_non_exhaustive()
    }
}

impl Admin {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.store.table_exists(table)
    }

    /// Creates the described table. Fails with `TableExists` if the name is
    /// already taken.
    pub fn create_table(&self, descriptor: TableDescriptor) -> Result<()> {
        descriptor.validate()?;
        let name = descriptor.name().to_string();
        let families = descriptor.families().len();
        self.store.create_table(descriptor)?;
        tracing::info!(table = %name, families, "table created");
        Ok(())
    }

    pub fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        self.store.list_tables()
    }
}
