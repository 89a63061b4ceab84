use grc_core::{GrcError, GrcResult};

/// One step of the schema history. Each revision names the revision it
/// builds on; the chain starts at the revision without a `down_revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub revision: &'static str,
    pub down_revision: Option<&'static str>,
    pub description: &'static str,
    pub create_date: &'static str,
    pub upgrade_sql: &'static str,
    pub downgrade_sql: &'static str,
}

pub const REVISIONS: &[Revision] = &[
    Revision {
        revision: "21628bac2031",
        down_revision: None,
        description: "Initial schema",
        create_date: "2017-04-20 10:02:11",
        upgrade_sql: include_str!("../../migrations/21628bac2031_initial_schema.up.sql"),
        downgrade_sql: include_str!("../../migrations/21628bac2031_initial_schema.down.sql"),
    },
    Revision {
        revision: "4c290531e2cd",
        down_revision: Some("21628bac2031"),
        description: "Create table for Label model",
        create_date: "2017-04-29 13:26:47",
        upgrade_sql: include_str!("../../migrations/4c290531e2cd_create_label_table.up.sql"),
        downgrade_sql: include_str!("../../migrations/4c290531e2cd_create_label_table.down.sql"),
    },
];

/// Revisions nothing else builds on.
pub fn heads() -> Vec<&'static str> {
    REVISIONS
        .iter()
        .filter(|r| !REVISIONS.iter().any(|other| other.down_revision == Some(r.revision)))
        .map(|r| r.revision)
        .collect()
}

/// The revision chain from base to head.
///
/// Fails unless there is exactly one base, every `down_revision` exists and
/// no revision has two children.
pub fn history() -> GrcResult<Vec<&'static Revision>> {
    chain(REVISIONS)
}

pub(crate) fn chain(revisions: &'static [Revision]) -> GrcResult<Vec<&'static Revision>> {
    let bases: Vec<&Revision> = revisions.iter().filter(|r| r.down_revision.is_none()).collect();
    let [base] = bases.as_slice() else {
        return Err(GrcError::Migration(format!(
            "Expected one base revision, found {}",
            bases.len()
        )));
    };

    for revision in revisions {
        if let Some(down) = revision.down_revision {
            if !revisions.iter().any(|r| r.revision == down) {
                return Err(GrcError::Migration(format!(
                    "Revision {} points to unknown revision {}",
                    revision.revision, down
                )));
            }
        }
    }

    let mut ordered = vec![*base];
    let mut current = *base;
    loop {
        let children: Vec<&Revision> = revisions
            .iter()
            .filter(|r| r.down_revision == Some(current.revision))
            .collect();
        match children.as_slice() {
            [] => break,
            [child] => {
                ordered.push(*child);
                current = *child;
            }
            _ => {
                return Err(GrcError::Migration(format!(
                    "Multiple revisions build on {}",
                    current.revision
                )))
            }
        }
        if ordered.len() > revisions.len() {
            return Err(GrcError::Migration("Revision chain contains a cycle".into()));
        }
    }

    if ordered.len() != revisions.len() {
        return Err(GrcError::Migration(
            "Some revisions are not reachable from the base revision".into(),
        ));
    }
    Ok(ordered)
}
