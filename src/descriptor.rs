use crate::encoding::format::Raw;
use crate::error::{Error, Result};

/// Number of versions kept per column unless the family says otherwise.
pub const DEFAULT_MAX_VERSIONS: u32 = 1;

/// Schema of one column family, fixed at table creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFamilyDescriptor {
    name: Vec<u8>,
    max_versions: u32,
}

impl ColumnFamilyDescriptor {
    pub fn new(name: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.as_ref().to_vec(),
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }

    /// Set how many versions of each column are retained
    pub fn max_versions(mut self, versions: u32) -> Self {
        self.max_versions = versions;
        self
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn versions(&self) -> u32 {
        self.max_versions
    }
}

/// Schema of a table: its name and declared families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    families: Vec<ColumnFamilyDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            families: Vec::new(),
        }
    }

    pub fn add_family(mut self, family: ColumnFamilyDescriptor) -> Self {
        self.families.push(family);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn families(&self) -> &[ColumnFamilyDescriptor] {
        &self.families
    }

    pub fn family(&self, name: &[u8]) -> Option<&ColumnFamilyDescriptor> {
        self.families.iter().find(|f| f.name == name)
    }

    pub fn has_family(&self, name: &[u8]) -> bool {
        self.family(name).is_some()
    }

    /// Checks the descriptor is creatable: a non-empty name, at least one
    /// family, no empty or duplicated family names and at least one version.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_argument("table name is empty"));
        }
        if self.families.is_empty() {
            return Err(Error::invalid_argument(format!(
                "table {} must declare at least one column family",
                self.name
            )));
        }
        for (i, family) in self.families.iter().enumerate() {
            if family.name.is_empty() {
                return Err(Error::invalid_argument("column family name is empty"));
            }
            if family.max_versions == 0 {
                return Err(Error::invalid_argument(format!(
                    "column family {} must keep at least one version",
                    Raw::bytes(&family.name)
                )));
            }
            if self.families[..i].iter().any(|f| f.name == family.name) {
                return Err(Error::invalid_argument(format!(
                    "column family {} declared twice",
                    Raw::bytes(&family.name)
                )));
            }
        }
        Ok(())
    }
}
