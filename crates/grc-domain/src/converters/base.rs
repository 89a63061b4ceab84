//! Top level CSV converters, handling every block of a file in order.

use grc_core::{AppConfig, GrcError, GrcResult};
use std::collections::HashMap;
use std::time::Instant;

use super::base_block::{ExportBlockConverter, ImportBlockConverter};
use super::exportables::ObjectType;
use super::hooks::{ImportHooks, LoggingImportHooks};
use super::import_helper::{extract_relevant_data, split_blocks, CsvStringBuilder, BLOCK_MARKER};
use super::models::{BlockInfo, ExportQuery, ImportJob, MailData, ObjectRef};
use crate::dataset::Dataset;

/// Column keys applied before any other column of a row.
pub const PRIORITY_COLUMNS: &[&str] = &[
    "email",
    "slug",
    "delete",
    "task_type",
    "audit",
    "assessment_template",
    "title",
];

pub struct ImportConverter {
    pub ie_job: ImportJob,
    pub dry_run: bool,
    csv_data: Vec<Vec<String>>,
    issue_tracker_enabled: bool,
    cache_enabled: bool,
    hooks: Box<dyn ImportHooks>,
    response_data: Vec<BlockInfo>,
    revision_ids: Vec<ObjectRef>,
}

impl ImportConverter {
    pub fn new(ie_job: ImportJob, dry_run: bool, csv_data: Vec<Vec<String>>, config: &AppConfig) -> Self {
        Self {
            ie_job,
            dry_run,
            csv_data,
            issue_tracker_enabled: config.issue_tracker_enabled,
            cache_enabled: config.memcache_mechanism,
            hooks: Box::new(LoggingImportHooks),
            response_data: Vec::new(),
            revision_ids: Vec::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ImportHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn get_info(&self) -> &[BlockInfo] {
        &self.response_data
    }

    /// Objects created, updated or deleted by the last import.
    pub fn revision_ids(&self) -> &[ObjectRef] {
        &self.revision_ids
    }

    pub fn initialize_block_converters(&self) -> Vec<ImportBlockConverter> {
        split_blocks(&self.csv_data)
            .into_iter()
            .map(|(offset, data, csv_lines)| {
                let class_name = data
                    .get(1)
                    .and_then(|line| line.first())
                    .map(|cell| cell.trim().to_lowercase())
                    .unwrap_or_default();
                let object_type = ObjectType::from_name(&class_name);
                let (raw_headers, rows) = extract_relevant_data(&data);
                let mut converter = ImportBlockConverter::new(
                    object_type,
                    class_name,
                    raw_headers,
                    rows,
                    offset,
                    csv_lines.into_iter().skip(2).collect(),
                );
                converter.check_block_restrictions();
                converter
            })
            .collect()
    }

    /// Imports every block, then starts the post-import jobs. A dry run works
    /// on a copy, so `data` stays untouched.
    pub fn import_csv_data(&mut self, data: &mut Dataset) {
        let _span = tracing::info_span!("import_csv_data", file = %self.ie_job.title, dry_run = self.dry_run).entered();
        let started = Instant::now();

        let mut scratch;
        let target: &mut Dataset = if self.dry_run {
            scratch = data.clone();
            &mut scratch
        } else {
            data
        };

        let collect_revisions = !self.dry_run;
        self.response_data.clear();
        self.revision_ids.clear();
        let mut seen_keys: HashMap<ObjectType, HashMap<String, usize>> = HashMap::new();
        for mut converter in self.initialize_block_converters() {
            if let (false, Some(object_type)) = (converter.ignore, converter.object_type) {
                converter.import_csv_data(
                    target,
                    PRIORITY_COLUMNS,
                    collect_revisions,
                    seen_keys.entry(object_type).or_default(),
                );
                self.revision_ids.append(&mut converter.revision_ids);
            }
            self.response_data.push(converter.get_info());
        }

        self.start_compute_attributes_job();
        if !self.dry_run && self.issue_tracker_enabled {
            self.start_issuetracker_update();
        }
        self.drop_cache();

        tracing::info!(
            blocks = self.response_data.len(),
            changed = self.revision_ids.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Import finished"
        );
    }

    fn user_email(&self) -> String {
        self.ie_job.user_email.clone().unwrap_or_default()
    }

    fn start_compute_attributes_job(&self) {
        if self.revision_ids.is_empty() {
            return;
        }
        if let Err(e) = self.hooks.compute_attributes(&self.revision_ids, &self.user_email()) {
            tracing::warn!(error = %e, "Failed to start computed attributes job");
        }
    }

    fn start_issuetracker_update(&self) {
        let mail_data = MailData {
            filename: self.ie_job.title.clone(),
            user_email: self.user_email(),
        };
        if let Err(e) = self.hooks.update_issue_tracker(&self.revision_ids, &mail_data) {
            tracing::warn!(error = %e, "Failed to start issue tracker update");
        }
    }

    fn drop_cache(&self) {
        if !self.cache_enabled {
            return;
        }
        if let Err(e) = self.hooks.drop_cache() {
            tracing::warn!(error = %e, "Failed to drop cache");
        }
    }
}

pub struct ExportConverter {
    ids_by_type: Vec<ExportQuery>,
    exportable_queries: Vec<usize>,
    block_converters: Vec<ExportBlockConverter>,
}

impl ExportConverter {
    /// `exportable_queries` holds indexes into `ids_by_type`; empty means all.
    pub fn new(ids_by_type: Vec<ExportQuery>, exportable_queries: Vec<usize>) -> Self {
        Self {
            ids_by_type,
            exportable_queries,
            block_converters: Vec::new(),
        }
    }

    pub fn get_object_names(&self) -> Vec<String> {
        self.block_converters
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn get_info(&self) -> Vec<BlockInfo> {
        self.block_converters.iter().map(|c| c.get_info()).collect()
    }

    fn get_exportable_queries(&self) -> Vec<&ExportQuery> {
        if self.exportable_queries.is_empty() {
            self.ids_by_type.iter().collect()
        } else {
            self.ids_by_type
                .iter()
                .enumerate()
                .filter(|(index, _)| self.exportable_queries.contains(index))
                .map(|(_, query)| query)
                .collect()
        }
    }

    pub fn initialize_block_converters(&mut self) -> GrcResult<()> {
        let mut converters = Vec::new();
        for query in self.get_exportable_queries() {
            let object_type = ObjectType::from_name(&query.object_name).ok_or_else(|| {
                GrcError::Validation(format!("Unknown object type '{}'", query.object_name))
            })?;
            converters.push(ExportBlockConverter::new(
                object_type,
                &query.fields,
                query.ids.clone(),
            ));
        }
        self.block_converters = converters;
        Ok(())
    }

    pub fn export_csv_data(&mut self, data: &Dataset) -> GrcResult<String> {
        let _span = tracing::info_span!("export_csv_data").entered();
        self.initialize_block_converters()?;
        if self.block_converters.is_empty() {
            return Ok(String::new());
        }
        self.build_csv_from_row_data(data)
    }

    /// Writes each block followed by two empty lines.
    fn build_csv_from_row_data(&mut self, data: &Dataset) -> GrcResult<String> {
        let table_width = self
            .block_converters
            .iter()
            .map(|c| c.block_width())
            .max()
            .unwrap_or(0)
            + 1;

        let mut builder = CsvStringBuilder::new(table_width);
        for converter in &mut self.block_converters {
            let [descriptions, names] = converter.generate_csv_header();
            builder.append_line(prepend(BLOCK_MARKER, descriptions));
            builder.append_line(prepend(converter.name(), names));
            for line in converter.generate_row_data(data) {
                builder.append_line(prepend("", line));
            }
            builder.append_line(Vec::new());
            builder.append_line(Vec::new());
        }
        builder.get_csv_string()
    }
}

fn prepend(first: &str, mut line: Vec<String>) -> Vec<String> {
    line.insert(0, first.to_string());
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::hooks::MockImportHooks;
    use crate::converters::import_helper::read_csv_data;
    use crate::converters::models::FieldSelection;
    use crate::cycle_task::TaskStatus;
    use chrono::NaiveDate;

    const PEOPLE_CSV: &str = "Object type,,\nPerson,Email*,Name\n,ann@example.com,Ann\n,bob@example.com,Bob\n";

    fn job() -> ImportJob {
        ImportJob::new("people.csv", Some("admin@example.com".into()))
    }

    fn import(data: &mut Dataset, content: &str, dry_run: bool) -> ImportConverter {
        let mut converter = ImportConverter::new(job(), dry_run, read_csv_data(content).unwrap(), &AppConfig::default());
        converter.import_csv_data(data);
        converter
    }

    fn seeded() -> Dataset {
        let mut data = Dataset::new();
        let workflow = data.add_workflow("Quarterly".into()).unwrap();
        let cycle = data.add_cycle(workflow.id, "Q4".into()).unwrap();
        data.add_cycle_task(cycle.id, "Review".into(), NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
            .unwrap();
        data
    }

    #[test]
    fn test_import_creates_people() {
        let mut data = Dataset::new();
        let converter = import(&mut data, PEOPLE_CSV, false);

        let info = &converter.get_info()[0];
        assert_eq!(info.name, "Person");
        assert_eq!((info.rows, info.created, info.updated, info.ignored), (2, 2, 0, 0));
        assert_eq!(data.people.len(), 2);
        assert_eq!(data.person_by_email("bob@example.com").unwrap().name, "Bob");
        assert_eq!(
            converter.revision_ids(),
            &[ObjectRef::new("Person", 1), ObjectRef::new("Person", 2)]
        );
    }

    #[test]
    fn test_reimport_only_counts_changes() {
        let mut data = Dataset::new();
        import(&mut data, PEOPLE_CSV, false);

        let converter = import(&mut data, &PEOPLE_CSV.replace("Bob\n", "Robert\n"), false);
        let info = &converter.get_info()[0];
        assert_eq!((info.created, info.updated), (0, 1));
        assert_eq!(converter.revision_ids(), &[ObjectRef::new("Person", 2)]);
        assert_eq!(data.person(2).unwrap().name, "Robert");
    }

    #[test]
    fn test_row_errors_reference_file_lines() {
        let mut data = Dataset::new();
        let content = "Object type,,,\n\
                       Person,Email*,Name,Nickname\n\
                       ,ann@example.com,Ann,\n\
                       ,,NoEmail,\n\
                       ,ANN@example.com,Dup,\n\
                       ,not-an-email,Bad,\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!((info.rows, info.created, info.ignored), (4, 1, 3));
        assert_eq!(
            info.block_warnings,
            vec!["Line 2: Attribute 'Nickname' does not exist. Column will be ignored."]
        );
        assert_eq!(
            info.row_errors,
            vec![
                "Line 4: Field 'Email' is required. The line will be ignored.",
                "Line 5: Field 'Email' has the same value 'ANN@example.com' as line 3. The line will be ignored.",
                "Line 6: 'not-an-email' is not a valid email. The line will be ignored.",
            ]
        );
    }

    #[test]
    fn test_block_errors_ignore_block() {
        let mut data = Dataset::new();
        let content = "Object type,\nAudit,Title*\n,x\n\n\
                       Object type,\nWorkflow,Code\n,WF-1\n\n\
                       Object type,,\nLabel,Title*,Title\n,Urgent,Urgent\n\n\
                       Object type,\nLabel,Title*\n,Urgent\n";
        let converter = import(&mut data, content, false);
        let info = converter.get_info();

        assert_eq!(info.len(), 4);
        assert_eq!(
            info[0].block_errors,
            vec!["Line 2: Unknown object type 'audit'. The block will be ignored."]
        );
        assert_eq!(
            info[1].block_errors,
            vec!["Line 6: Missing mandatory column Title, when adding object. The block will be ignored."]
        );
        assert_eq!(
            info[2].block_errors,
            vec!["Line 10: Duplicate column name 'Title'. The block will be ignored."]
        );
        assert_eq!(info[3].created, 1);
        assert!(data.workflows.is_empty());
        assert_eq!(data.labels.len(), 1);
    }

    fn workflow_slugs(data: &Dataset) -> Vec<(i64, String)> {
        data.workflows.iter().map(|w| (w.id, w.slug.clone())).collect()
    }

    #[test]
    fn test_generated_workflow_code_skips_taken_codes() {
        let mut data = Dataset::new();
        let content = "Object type,,\nWorkflow,Code,Title*\n,WORKFLOW-2,First\n,,Second\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!((info.created, info.ignored), (2, 0));
        assert!(info.row_errors.is_empty());
        assert_eq!(
            workflow_slugs(&data),
            vec![(1, "WORKFLOW-2".to_string()), (2, "WORKFLOW-3".to_string())]
        );

        let third = data.add_workflow("Third".into()).unwrap();
        assert_eq!((third.id, third.slug.as_str()), (3, "WORKFLOW-4"));
        assert_eq!(data.workflow_by_slug("WORKFLOW-2").unwrap().title, "First");
    }

    #[test]
    fn test_generated_workflow_code_is_a_used_key() {
        let mut data = Dataset::new();
        let content = "Object type,,\nWorkflow,Code,Title*\n,,First\n,workflow-1,Renamed\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!((info.created, info.updated, info.ignored), (1, 0, 1));
        assert_eq!(
            info.row_errors,
            vec!["Line 4: Field 'Code' has the same value 'workflow-1' as line 3. The line will be ignored."]
        );
        assert_eq!(data.workflow(1).unwrap().title, "First");
    }

    #[test]
    fn test_duplicate_key_across_blocks() {
        let mut data = Dataset::new();
        let content = "Object type,,\nPerson,Email*,Name\n,ann@example.com,Ann\n\n\
                       Object type,\nLabel,Title*\n,Urgent\n\n\
                       Object type,,\nPerson,Email*,Name\n,Ann@Example.com,Annie\n,bob@example.com,Bob\n";
        let converter = import(&mut data, content, false);
        let info = converter.get_info();

        assert_eq!(info.len(), 3);
        assert_eq!((info[1].created, info[1].ignored), (1, 0));
        assert_eq!((info[2].created, info[2].updated, info[2].ignored), (1, 0, 1));
        assert_eq!(
            info[2].row_errors,
            vec!["Line 11: Field 'Email' has the same value 'Ann@Example.com' as line 3. The line will be ignored."]
        );
        assert_eq!(data.person_by_email("ann@example.com").unwrap().name, "Ann");
    }

    #[test]
    fn test_cycle_tasks_are_only_updated() {
        let mut data = seeded();
        let content = "Object type,,,\n\
                       Cycle Task,Code*,Summary*,State\n\
                       ,CYCLETASK-1,Review,Finished\n\
                       ,CYCLETASK-9,Ghost,Assigned\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!(info.name, "CycleTaskGroupObjectTask");
        assert_eq!((info.updated, info.ignored, info.created), (1, 1, 0));
        assert_eq!(
            info.row_errors,
            vec!["Line 4: CycleTaskGroupObjectTask 'CYCLETASK-9' does not exist and cannot be created by import. The line will be ignored."]
        );
        let task = data.cycle_task(1).unwrap();
        assert_eq!(task.status, TaskStatus::Finished);
        assert!(task.finished_date.is_some());
        assert_eq!(data.cycle_tasks.len(), 1);
    }

    #[test]
    fn test_invalid_value_is_a_warning() {
        let mut data = seeded();
        let content = "Object type,,,\n\
                       Workflow,Code,Title*,Unit\n\
                       ,WORKFLOW-1,Quarterly review,yearly\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!(info.updated, 1);
        assert_eq!(
            info.row_warnings,
            vec!["Line 3: Field 'Unit' has invalid value. Unknown unit 'yearly'. The value will be ignored."]
        );
        let workflow = data.workflow(1).unwrap();
        assert_eq!(workflow.title, "Quarterly review");
        assert!(workflow.unit.is_none());
    }

    #[test]
    fn test_delete_column() {
        let mut data = Dataset::new();
        data.add_label("Urgent".into(), None).unwrap();
        let content = "Object type,,\nLabel,Title*,Delete\n,urgent,yes\n,Missing,yes\n";
        let converter = import(&mut data, content, false);
        let info = &converter.get_info()[0];

        assert_eq!((info.deleted, info.ignored), (1, 1));
        assert!(data.labels.is_empty());
        assert_eq!(
            info.row_warnings,
            vec!["Line 4: Object does not exist, so it cannot be deleted. The line will be ignored."]
        );
    }

    #[test]
    fn test_dry_run_leaves_data_untouched() {
        let mut data = Dataset::new();
        let mut hooks = MockImportHooks::new();
        hooks.expect_compute_attributes().times(0);
        hooks.expect_update_issue_tracker().times(0);
        hooks.expect_drop_cache().times(1).returning(|| Ok(()));
        let config = AppConfig {
            issue_tracker_enabled: true,
            memcache_mechanism: true,
            ..Default::default()
        };

        let mut converter = ImportConverter::new(job(), true, read_csv_data(PEOPLE_CSV).unwrap(), &config)
            .with_hooks(Box::new(hooks));
        converter.import_csv_data(&mut data);

        assert!(data.people.is_empty());
        assert_eq!(converter.get_info()[0].created, 2);
        assert!(converter.revision_ids().is_empty());
    }

    #[test]
    fn test_post_import_hooks() {
        let mut data = Dataset::new();
        let mut hooks = MockImportHooks::new();
        hooks
            .expect_compute_attributes()
            .withf(|ids, user| ids.len() == 2 && user.to_string() == "admin@example.com")
            .times(1)
            .returning(|_, _| Ok(()));
        hooks
            .expect_update_issue_tracker()
            .withf(|ids, mail| {
                ids.len() == 2 && mail.filename == "people.csv" && mail.user_email == "admin@example.com"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        hooks
            .expect_drop_cache()
            .times(1)
            .returning(|| Err(grc_core::GrcError::Connection("cache down".into())));
        let config = AppConfig {
            issue_tracker_enabled: true,
            memcache_mechanism: true,
            ..Default::default()
        };

        let mut converter = ImportConverter::new(job(), false, read_csv_data(PEOPLE_CSV).unwrap(), &config)
            .with_hooks(Box::new(hooks));
        converter.import_csv_data(&mut data);

        assert_eq!(data.people.len(), 2);
    }

    #[test]
    fn test_hooks_skipped_when_disabled() {
        let mut data = Dataset::new();
        let mut hooks = MockImportHooks::new();
        hooks.expect_compute_attributes().times(1).returning(|_, _| Ok(()));
        hooks.expect_update_issue_tracker().times(0);
        hooks.expect_drop_cache().times(0);

        let mut converter =
            ImportConverter::new(job(), false, read_csv_data(PEOPLE_CSV).unwrap(), &AppConfig::default())
                .with_hooks(Box::new(hooks));
        converter.import_csv_data(&mut data);
    }

    #[test]
    fn test_export_labels() {
        let mut data = Dataset::new();
        data.add_label("Urgent".into(), None).unwrap();
        data.add_label("Low".into(), None).unwrap();

        let mut converter = ExportConverter::new(vec![ExportQuery::new("Label", vec![1, 2, 42])], Vec::new());
        let csv = converter.export_csv_data(&data).unwrap();

        assert_eq!(csv, "Object type,\nLabel,Title*\n,Urgent\n,Low\n,\n,\n");
        assert_eq!(converter.get_object_names(), vec!["Label"]);
        assert_eq!(converter.get_info()[0].rows, 2);
    }

    #[test]
    fn test_export_pads_to_widest_block() {
        let mut data = seeded();
        data.add_label("Urgent".into(), None).unwrap();
        let queries = vec![
            ExportQuery::new("Label", vec![1]),
            ExportQuery {
                object_name: "Workflow".into(),
                ids: vec![1],
                fields: FieldSelection::Keys(vec!["slug".into(), "title".into(), "nope".into()]),
            },
        ];

        let csv = ExportConverter::new(queries, Vec::new()).export_csv_data(&data).unwrap();
        let expected = "Object type,,\nLabel,Title*,\n,Urgent,\n,,\n,,\n\
                        Object type,Leave empty to generate a new code,\nWorkflow,Code,Title*\n,WORKFLOW-1,Quarterly\n,,\n,,\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_export_query_selection() {
        let data = seeded();
        let queries = vec![
            ExportQuery::new("Person", vec![]),
            ExportQuery::new("cycle task", vec![1]),
        ];
        let mut converter = ExportConverter::new(queries, vec![1]);
        let csv = converter.export_csv_data(&data).unwrap();

        assert_eq!(converter.get_object_names(), vec!["CycleTaskGroupObjectTask"]);
        assert!(csv.contains(",CYCLETASK-1,Review,,Assigned,,10/20/2026,,,CYCLE-1,WORKFLOW-1"));
    }

    #[test]
    fn test_export_edge_cases() {
        let data = Dataset::new();
        assert_eq!(ExportConverter::new(Vec::new(), Vec::new()).export_csv_data(&data).unwrap(), "");

        let err = ExportConverter::new(vec![ExportQuery::new("Audit", vec![1])], Vec::new())
            .export_csv_data(&data)
            .unwrap_err();
        assert!(matches!(err, grc_core::GrcError::Validation(_)));
    }

    #[test]
    fn test_exported_file_imports_back() {
        let mut data = seeded();
        data.add_person("ann@example.com".into(), "Ann".into()).unwrap();
        data.cycle_task_mut(1)
            .unwrap()
            .add_person_to_role(crate::cycle_task::TASK_ASSIGNEES, 1);
        let csv = ExportConverter::new(
            vec![ExportQuery::new("Person", vec![1]), ExportQuery::new("CycleTaskGroupObjectTask", vec![1])],
            Vec::new(),
        )
        .export_csv_data(&data)
        .unwrap();

        let before = data.clone();
        let converter = import(&mut data, &csv, false);
        for info in converter.get_info() {
            assert!(info.block_errors.is_empty(), "{:?}", info);
            assert!(info.row_errors.is_empty(), "{:?}", info);
            assert_eq!((info.created, info.updated, info.ignored), (0, 0, 0));
        }
        assert_eq!(data, before);
    }
}
