//! Catalog-agnostic orchestration of CREATE / CREATE OR REPLACE / REPLACE
//! TABLE flows.
//!
//! The orchestrator is pure decision logic over the request and a handful of
//! observations (catalog existence, log existence, location emptiness). It
//! stages actions on a [`Transaction`] and commits only when something
//! actually changed: an all-no-op orchestration issues no commit at all.
//! Catalog registration runs after the commit, never inside the atomic
//! append path.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::actions::{Action, Metadata, Protocol};
use crate::error::{Error, TableResult};
use crate::log::TableLog;
use crate::schema::{StructField, StructType};
use crate::transaction::{CommittedTransaction, Operation, Transaction};
use crate::utils::require;
use crate::Version;

/// Field-metadata key holding a column's stable mapping id.
pub const COLUMN_MAPPING_ID_KEY: &str = "tablelog.columnMapping.id";
/// Field-metadata key holding a column's physical name.
pub const COLUMN_MAPPING_PHYSICAL_NAME_KEY: &str = "tablelog.columnMapping.physicalName";
/// Table property selecting the column mapping mode.
pub const COLUMN_MAPPING_MODE_PROP: &str = "tablelog.columnMapping.mode";
/// Table property tracking the highest assigned column id. Maintained by the
/// writer, not part of the user-visible table definition.
pub const COLUMN_MAPPING_MAX_ID_PROP: &str = "tablelog.columnMapping.maxColumnId";

const COLUMN_MAPPING_FIELD_METADATA_KEYS: &[&str] =
    &[COLUMN_MAPPING_ID_KEY, COLUMN_MAPPING_PHYSICAL_NAME_KEY];
const COLUMN_MAPPING_PROPS: &[&str] = &[COLUMN_MAPPING_MODE_PROP, COLUMN_MAPPING_MAX_ID_PROP];

/// The three table-creation statements. A closed set: each carries its
/// default write mode and whether it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    Create,
    CreateOrReplace,
    Replace,
}

impl CreationMode {
    pub fn default_write_mode(&self) -> WriteMode {
        match self {
            Self::Create => WriteMode::ErrorIfExists,
            Self::CreateOrReplace | Self::Replace => WriteMode::Overwrite,
        }
    }

    pub fn is_create(&self) -> bool {
        !matches!(self, Self::Replace)
    }

    pub fn is_replace(&self) -> bool {
        !matches!(self, Self::Create)
    }

    fn operation(&self) -> Operation {
        match self {
            Self::Create => Operation::CreateTable,
            Self::CreateOrReplace => Operation::CreateOrReplaceTable,
            Self::Replace => Operation::ReplaceTable,
        }
    }
}

impl std::fmt::Display for CreationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation().name())
    }
}

/// What to do when the table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    ErrorIfExists,
    Ignore,
    Overwrite,
}

/// Catalog collaborator. Registration runs post-commit only.
pub trait Catalog: Send + Sync {
    fn entry_exists(&self, table: &str) -> TableResult<bool>;

    fn create_entry(&self, table: &str, metadata: &Metadata) -> TableResult<()>;

    fn alter_entry(&self, table: &str, metadata: &Metadata) -> TableResult<()>;
}

/// File-listing collaborator for the managed-table precondition.
pub trait LocationLister: Send + Sync {
    /// True when `location` does not exist or holds no files.
    fn is_empty_or_absent(&self, location: &str) -> TableResult<bool>;
}

/// Everything a creation flow decides on.
#[derive(Debug, Clone)]
pub struct CreateTableRequest {
    pub table_name: String,
    pub mode: CreationMode,
    /// `None` picks [`CreationMode::default_write_mode`].
    pub write_mode: Option<WriteMode>,
    /// `None` means the caller omitted the schema (CTAS-less external table
    /// registration, or an empty-schema table when allowed).
    pub schema: Option<StructType>,
    pub partition_columns: Vec<String>,
    pub properties: HashMap<String, String>,
    pub description: Option<String>,
    /// Managed tables own their location; creation requires it empty or
    /// absent.
    pub is_managed_table: bool,
    pub allow_empty_schema: bool,
    /// Whether a replace may install the requested schema over the existing
    /// one. Data-path writers pass `false`, DDL passes `true`.
    pub overwrite_schema: bool,
}

impl CreateTableRequest {
    pub fn new(table_name: impl Into<String>, mode: CreationMode) -> Self {
        Self {
            table_name: table_name.into(),
            mode,
            write_mode: None,
            schema: None,
            partition_columns: vec![],
            properties: HashMap::new(),
            description: None,
            is_managed_table: false,
            allow_empty_schema: false,
            overwrite_schema: true,
        }
    }

    pub fn with_schema(mut self, schema: StructType) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// What the orchestration did.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateTableOutcome {
    /// The table existed and the write mode was `Ignore`; nothing happened.
    Ignored,
    /// A new table log was committed at `version`.
    Created { version: Version },
    /// The log already held a matching table definition; nothing was
    /// committed.
    Verified,
    /// The table was truncated and its metadata replaced at `version`.
    Replaced { version: Version },
}

/// Runs a creation/replace flow end to end.
#[instrument(skip_all, fields(table = %request.table_name, mode = %request.mode), err)]
pub fn create_or_replace_table(
    log: &Arc<TableLog>,
    request: CreateTableRequest,
    catalog: &dyn Catalog,
    lister: &dyn LocationLister,
) -> TableResult<CreateTableOutcome> {
    let write_mode = request
        .write_mode
        .unwrap_or_else(|| request.mode.default_write_mode());
    let table_exists = catalog.entry_exists(&request.table_name)?;

    if table_exists && request.mode == CreationMode::Create {
        match write_mode {
            WriteMode::Ignore => {
                info!("table exists and write mode is Ignore");
                return Ok(CreateTableOutcome::Ignored);
            }
            WriteMode::ErrorIfExists => {
                return Err(Error::TableAlreadyExists(request.table_name))
            }
            WriteMode::Overwrite => {}
        }
    }
    require!(
        !(request.mode.is_replace() && request.schema.is_none()),
        Error::SchemaNotProvided(format!("{} requires an explicit schema", request.mode))
    );
    require!(
        !(request.mode.is_replace() && !request.overwrite_schema),
        Error::unsupported(format!(
            "{} was requested together with schema overwrite disabled",
            request.mode
        ))
    );

    let mut txn = log.start_transaction(None)?;
    let log_exists = !txn.snapshot().is_initial();

    if !log_exists {
        require!(
            request.mode != CreationMode::Replace,
            Error::generic(format!(
                "Cannot REPLACE table {}: it does not exist",
                request.table_name
            ))
        );
        if request.is_managed_table {
            require!(
                lister.is_empty_or_absent(log.location())?,
                Error::LocationNotEmpty(log.location().to_string())
            );
        }
        if request.schema.is_none() && !request.allow_empty_schema {
            return Err(Error::SchemaNotProvided(format!(
                "no table log exists at {} to read a schema from",
                log.location()
            )));
        }

        let schema = request
            .schema
            .clone()
            .unwrap_or_else(|| StructType::new_unchecked(Vec::<StructField>::new()));
        let metadata = request_metadata(&request, &schema)?;
        txn.update_protocol(Protocol::default())?;
        txn.update_metadata_for_new_table(metadata.clone())?;
        let committed = commit_if_needed(txn, vec![], request.mode.operation())?;
        let version = committed
            .ok_or_else(|| Error::internal_error("creating a table always stages changes"))?
            .commit_version();
        sync_catalog(catalog, &request.table_name, &metadata, table_exists)?;
        return Ok(CreateTableOutcome::Created { version });
    }

    match request.mode {
        CreationMode::Create => {
            // An existing log and no overwrite: the requested definition must
            // match what is committed, field for field.
            let existing = txn
                .metadata()
                .ok_or_else(|| {
                    Error::generic(format!(
                        "table log at {} has no committed metadata",
                        log.location()
                    ))
                })?
                .clone();
            if let Some(schema) = &request.schema {
                let requested = request_metadata(&request, schema)?;
                verify_metadata_matches(&existing, &requested)?;
            }
            sync_catalog(catalog, &request.table_name, &existing, table_exists)?;
            Ok(CreateTableOutcome::Verified)
        }
        CreationMode::CreateOrReplace | CreationMode::Replace => {
            let schema = request
                .schema
                .as_ref()
                .ok_or_else(|| Error::internal_error("replace flows were checked for a schema"))?;
            let mut metadata = request_metadata(&request, schema)?;
            // The table id survives a replace; only the definition changes.
            if let Some(existing) = txn.metadata() {
                metadata.id = existing.id.clone();
            }

            // Whole-table truncation: every active file becomes a removal
            // tombstone stamped with this operation's timestamp.
            let removes: Vec<Action> = txn
                .filter_files()
                .iter()
                .cloned()
                .map(|file| Action::Remove(file.into_remove(txn.commit_timestamp(), true)))
                .collect();
            txn.update_metadata_for_new_table(metadata.clone())?;
            let committed = commit_if_needed(txn, removes, request.mode.operation())?;
            let version = committed
                .ok_or_else(|| Error::internal_error("replacing a table always stages changes"))?
                .commit_version();
            sync_catalog(catalog, &request.table_name, &metadata, table_exists)?;
            Ok(CreateTableOutcome::Replaced { version })
        }
    }
}

fn request_metadata(request: &CreateTableRequest, schema: &StructType) -> TableResult<Metadata> {
    Metadata::try_new(
        Some(request.table_name.clone()),
        request.description.clone(),
        schema,
        request.partition_columns.clone(),
        request.properties.clone(),
    )
}

/// Commits iff there is anything to commit: a non-empty action buffer, or
/// staged metadata/protocol differing from the pre-commit snapshot.
fn commit_if_needed(
    txn: Transaction,
    actions: Vec<Action>,
    operation: Operation,
) -> TableResult<Option<CommittedTransaction>> {
    if actions.is_empty() && !txn.metadata_changed() && !txn.protocol_changed() {
        info!("nothing staged, skipping the commit");
        return Ok(None);
    }
    Ok(Some(txn.commit(actions, operation)?))
}

fn sync_catalog(
    catalog: &dyn Catalog,
    table: &str,
    metadata: &Metadata,
    table_exists: bool,
) -> TableResult<()> {
    if table_exists {
        catalog.alter_entry(table, metadata)
    } else {
        catalog.create_entry(table, metadata)
    }
}

/// Diff-checks a requested table definition against the committed one.
///
/// Schema comparison ignores column-mapping-internal field metadata, and
/// property comparison ignores column-mapping-internal properties, except
/// that a column-mapping property present on both sides must match. Any
/// difference fails with [`Error::MetadataMismatch`] naming what differs.
pub(crate) fn verify_metadata_matches(
    existing: &Metadata,
    requested: &Metadata,
) -> TableResult<()> {
    let existing_schema = strip_column_mapping_metadata(&existing.parse_schema()?);
    let requested_schema = strip_column_mapping_metadata(&requested.parse_schema()?);
    require!(
        existing_schema == requested_schema,
        Error::metadata_mismatch(
            "schema",
            format!(
                "Specified schema {} but the existing schema is {}",
                requested.schema_string, existing.schema_string
            ),
        )
    );
    require!(
        existing.partition_columns == requested.partition_columns,
        Error::metadata_mismatch(
            "partition columns",
            format!(
                "Specified partitioning [{}] but the existing partitioning is [{}]",
                requested.partition_columns.join(", "),
                existing.partition_columns.join(", ")
            ),
        )
    );

    let visible =
        |configuration: &HashMap<String, String>| -> HashMap<String, String> {
            configuration
                .iter()
                .filter(|(key, _)| !COLUMN_MAPPING_PROPS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };
    let existing_props = visible(&existing.configuration);
    let requested_props = visible(&requested.configuration);
    if existing_props != requested_props {
        let mut keys: Vec<&str> = existing_props
            .keys()
            .chain(requested_props.keys())
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        let differing = keys
            .into_iter()
            .find(|key| existing_props.get(*key) != requested_props.get(*key))
            .unwrap_or("properties");
        return Err(Error::metadata_mismatch(
            format!("property '{differing}'"),
            format!(
                "Specified value {:?} but the existing value is {:?}",
                requested_props.get(differing),
                existing_props.get(differing)
            ),
        ));
    }
    for prop in COLUMN_MAPPING_PROPS {
        if let (Some(existing_value), Some(requested_value)) = (
            existing.configuration.get(*prop),
            requested.configuration.get(*prop),
        ) {
            require!(
                existing_value == requested_value,
                Error::metadata_mismatch(
                    format!("property '{prop}'"),
                    format!(
                        "Specified value {requested_value:?} but the existing value is {existing_value:?}"
                    ),
                )
            );
        }
    }
    Ok(())
}

fn strip_column_mapping_metadata(schema: &StructType) -> StructType {
    StructType::new_unchecked(
        schema
            .fields()
            .map(|field| field.without_metadata_keys(COLUMN_MAPPING_FIELD_METADATA_KEYS)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{InMemoryLogStore, LogStore};
    use crate::schema::{DataType, MetadataValue};
    use crate::transaction::Operation;
    use parking_lot::Mutex;

    struct TestCatalog {
        exists: bool,
        created: Mutex<Vec<String>>,
        altered: Mutex<Vec<String>>,
    }

    impl TestCatalog {
        fn new(exists: bool) -> Self {
            Self {
                exists,
                created: Mutex::new(vec![]),
                altered: Mutex::new(vec![]),
            }
        }
    }

    impl Catalog for TestCatalog {
        fn entry_exists(&self, _table: &str) -> TableResult<bool> {
            Ok(self.exists)
        }

        fn create_entry(&self, table: &str, _metadata: &Metadata) -> TableResult<()> {
            self.created.lock().push(table.to_string());
            Ok(())
        }

        fn alter_entry(&self, table: &str, _metadata: &Metadata) -> TableResult<()> {
            self.altered.lock().push(table.to_string());
            Ok(())
        }
    }

    struct TestLister {
        empty: bool,
    }

    impl LocationLister for TestLister {
        fn is_empty_or_absent(&self, _location: &str) -> TableResult<bool> {
            Ok(self.empty)
        }
    }

    fn test_schema() -> StructType {
        StructType::try_new(vec![
            StructField::not_null("id", DataType::LONG),
            StructField::nullable("part", DataType::STRING),
        ])
        .unwrap()
    }

    fn new_log() -> (Arc<TableLog>, Arc<InMemoryLogStore>) {
        let store = Arc::new(InMemoryLogStore::new());
        let log = Arc::new(TableLog::new(
            "memory://events",
            store.clone() as Arc<dyn LogStore>,
        ));
        (log, store)
    }

    fn create_request() -> CreateTableRequest {
        CreateTableRequest::new("events", CreationMode::Create).with_schema(test_schema())
    }

    #[test]
    fn existing_table_with_ignore_mode_is_a_no_op() {
        let (log, store) = new_log();
        let catalog = TestCatalog::new(true);
        let mut request = create_request();
        request.write_mode = Some(WriteMode::Ignore);
        let outcome =
            create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();
        assert_eq!(outcome, CreateTableOutcome::Ignored);
        // Zero actions, zero commits, no catalog writes.
        assert_eq!(store.latest_version().unwrap(), None);
        assert!(catalog.created.lock().is_empty());
        assert!(catalog.altered.lock().is_empty());
    }

    #[test]
    fn existing_table_with_error_mode_fails() {
        let (log, store) = new_log();
        let catalog = TestCatalog::new(true);
        let err = create_or_replace_table(
            &log,
            create_request(),
            &catalog,
            &TestLister { empty: true },
        )
        .unwrap_err();
        assert!(matches!(err, Error::TableAlreadyExists(_)), "got {err}");
        assert_eq!(store.latest_version().unwrap(), None);
    }

    #[test]
    fn managed_table_requires_an_empty_location() {
        let (log, store) = new_log();
        let catalog = TestCatalog::new(false);
        let mut request = create_request();
        request.is_managed_table = true;
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: false })
            .unwrap_err();
        assert!(matches!(err, Error::LocationNotEmpty(_)), "got {err}");
        // Failed before any commit was attempted.
        assert_eq!(store.latest_version().unwrap(), None);
    }

    #[test]
    fn creates_a_new_table_at_version_zero() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let outcome = create_or_replace_table(
            &log,
            create_request(),
            &catalog,
            &TestLister { empty: true },
        )
        .unwrap();
        assert_eq!(outcome, CreateTableOutcome::Created { version: 0 });

        let snapshot = log.update().unwrap();
        let metadata = snapshot.metadata().unwrap();
        assert_eq!(metadata.name.as_deref(), Some("events"));
        assert_eq!(metadata.parse_schema().unwrap(), test_schema());
        assert_eq!(snapshot.protocol(), Some(&Protocol::default()));
        assert_eq!(*catalog.created.lock(), vec!["events".to_string()]);
    }

    #[test]
    fn external_table_without_schema_requires_an_existing_log() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let request = CreateTableRequest::new("events", CreationMode::Create);
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        assert!(matches!(err, Error::SchemaNotProvided(_)), "got {err}");
    }

    #[test]
    fn empty_schema_table_when_explicitly_allowed() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let mut request = CreateTableRequest::new("events", CreationMode::Create);
        request.allow_empty_schema = true;
        let outcome =
            create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();
        assert_eq!(outcome, CreateTableOutcome::Created { version: 0 });
        let snapshot = log.update().unwrap();
        assert!(snapshot.metadata().unwrap().parse_schema().unwrap().is_empty());
    }

    #[test]
    fn verifies_matching_metadata_without_committing() {
        let (log, store) = new_log();
        let catalog = TestCatalog::new(false);
        create_or_replace_table(&log, create_request(), &catalog, &TestLister { empty: true })
            .unwrap();
        let version_before = store.latest_version().unwrap();

        // Registering the same definition over the existing log changes
        // nothing and commits nothing.
        let outcome = create_or_replace_table(
            &log,
            create_request(),
            &catalog,
            &TestLister { empty: true },
        )
        .unwrap();
        assert_eq!(outcome, CreateTableOutcome::Verified);
        assert_eq!(store.latest_version().unwrap(), version_before);
    }

    #[test]
    fn mismatching_schema_fails_verification() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        create_or_replace_table(&log, create_request(), &catalog, &TestLister { empty: true })
            .unwrap();

        let other_schema =
            StructType::try_new(vec![StructField::not_null("other", DataType::LONG)]).unwrap();
        let request = CreateTableRequest::new("events", CreationMode::Create)
            .with_schema(other_schema);
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        match err {
            Error::MetadataMismatch { property, .. } => assert_eq!(property, "schema"),
            other => panic!("expected a metadata mismatch, got {other}"),
        }
    }

    #[test]
    fn mismatching_partitioning_fails_verification() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        create_or_replace_table(&log, create_request(), &catalog, &TestLister { empty: true })
            .unwrap();

        let mut request = create_request();
        request.partition_columns = vec!["part".to_string()];
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        match err {
            Error::MetadataMismatch { property, .. } => {
                assert_eq!(property, "partition columns")
            }
            other => panic!("expected a metadata mismatch, got {other}"),
        }
    }

    #[test]
    fn mismatching_property_is_named() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let mut request = create_request();
        request
            .properties
            .insert("retention".to_string(), "7d".to_string());
        create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();

        let mut request = create_request();
        request
            .properties
            .insert("retention".to_string(), "30d".to_string());
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        match err {
            Error::MetadataMismatch { property, .. } => {
                assert_eq!(property, "property 'retention'")
            }
            other => panic!("expected a metadata mismatch, got {other}"),
        }
    }

    #[test]
    fn column_mapping_internals_are_ignored_in_verification() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let mut request = create_request();
        request
            .properties
            .insert(COLUMN_MAPPING_MAX_ID_PROP.to_string(), "5".to_string());
        create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();

        // Same definition minus the internal property still verifies, and
        // internal field metadata on the requested schema is ignored too.
        let schema_with_mapping = StructType::try_new(vec![
            StructField::not_null("id", DataType::LONG)
                .with_metadata(vec![(COLUMN_MAPPING_ID_KEY, MetadataValue::Long(1))]),
            StructField::nullable("part", DataType::STRING),
        ])
        .unwrap();
        let request =
            CreateTableRequest::new("events", CreationMode::Create).with_schema(schema_with_mapping);
        let outcome =
            create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();
        assert_eq!(outcome, CreateTableOutcome::Verified);
    }

    #[test]
    fn column_mapping_mode_present_on_both_sides_must_match() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let mut request = create_request();
        request
            .properties
            .insert(COLUMN_MAPPING_MODE_PROP.to_string(), "name".to_string());
        create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();

        let mut request = create_request();
        request
            .properties
            .insert(COLUMN_MAPPING_MODE_PROP.to_string(), "id".to_string());
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        assert!(matches!(err, Error::MetadataMismatch { .. }), "got {err}");
    }

    #[test]
    fn replace_truncates_and_replaces_metadata() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        create_or_replace_table(&log, create_request(), &catalog, &TestLister { empty: true })
            .unwrap();
        let original_id = log.update().unwrap().metadata().unwrap().id.clone();

        // Land a data file before the replace.
        log.start_transaction(None)
            .unwrap()
            .commit(
                vec![Action::Add(crate::actions::AddFile {
                    path: "a.parquet".to_string(),
                    size: 1,
                    modification_time: 1,
                    data_change: true,
                    ..Default::default()
                })],
                Operation::Write,
            )
            .unwrap();

        let new_schema =
            StructType::try_new(vec![StructField::not_null("other", DataType::LONG)]).unwrap();
        let catalog = TestCatalog::new(true);
        let request = CreateTableRequest::new("events", CreationMode::CreateOrReplace)
            .with_schema(new_schema.clone());
        let outcome =
            create_or_replace_table(&log, request, &catalog, &TestLister { empty: true }).unwrap();
        assert_eq!(outcome, CreateTableOutcome::Replaced { version: 2 });

        let snapshot = log.update().unwrap();
        assert!(snapshot.active_files().is_empty());
        let metadata = snapshot.metadata().unwrap();
        assert_eq!(metadata.parse_schema().unwrap(), new_schema);
        // The table id survives the replace.
        assert_eq!(metadata.id, original_id);
        assert_eq!(*catalog.altered.lock(), vec!["events".to_string()]);
    }

    #[test]
    fn replace_without_a_schema_is_rejected() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(true);
        let request = CreateTableRequest::new("events", CreationMode::Replace);
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        assert!(matches!(err, Error::SchemaNotProvided(_)), "got {err}");
    }

    #[test]
    fn replace_with_schema_overwrite_disabled_is_rejected() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(true);
        let mut request =
            CreateTableRequest::new("events", CreationMode::Replace).with_schema(test_schema());
        request.overwrite_schema = false;
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)), "got {err}");
    }

    #[test]
    fn replace_of_a_missing_table_is_rejected() {
        let (log, _) = new_log();
        let catalog = TestCatalog::new(false);
        let request =
            CreateTableRequest::new("events", CreationMode::Replace).with_schema(test_schema());
        let err = create_or_replace_table(&log, request, &catalog, &TestLister { empty: true })
            .unwrap_err();
        assert!(matches!(err, Error::Generic(_)), "got {err}");
    }

    #[test]
    fn creation_mode_carries_its_defaults() {
        assert_eq!(
            CreationMode::Create.default_write_mode(),
            WriteMode::ErrorIfExists
        );
        assert_eq!(
            CreationMode::CreateOrReplace.default_write_mode(),
            WriteMode::Overwrite
        );
        assert_eq!(
            CreationMode::Replace.default_write_mode(),
            WriteMode::Overwrite
        );
        assert!(CreationMode::Create.is_create());
        assert!(CreationMode::CreateOrReplace.is_create());
        assert!(!CreationMode::Replace.is_create());
        assert!(CreationMode::Replace.is_replace());
    }
}
