use crate::cli::{CycleAction, WorkflowAction, WorkflowCreateArgs};
use crate::context::CliContext;
use crate::output;
use grc_domain::{Unit, Workflow};

pub async fn handle(ctx: &mut CliContext, action: WorkflowAction) -> anyhow::Result<()> {
    match action {
        WorkflowAction::Create(args) => {
            let workflow = handle_create(ctx, args)?;
            ctx.save().await?;
            output::output_success(&workflow);
        }
        WorkflowAction::List => {
            output::output_list(ctx.data.workflows.clone());
        }
        WorkflowAction::Archive { id } => match ctx.data.workflow_mut(id) {
            Some(workflow) => {
                workflow.archive();
                let workflow = workflow.clone();
                ctx.save().await?;
                output::output_success(serde_json::json!({
                    "workflow": workflow,
                    "workflow_archived": workflow.workflow_archived(),
                }));
            }
            None => return output::output_error(&format!("Workflow not found: {}", id)),
        },
    }
    Ok(())
}

fn handle_create(ctx: &mut CliContext, args: WorkflowCreateArgs) -> anyhow::Result<Workflow> {
    let schedule = match (args.unit, args.repeat_every) {
        (Some(unit), Some(repeat_every)) => {
            let unit: Unit = unit.parse().map_err(anyhow::Error::msg)?;
            let start = args
                .next_cycle_start_date
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            Some((unit, repeat_every, start))
        }
        _ => None,
    };

    let id = ctx.data.add_workflow(args.title)?.id;
    let workflow = ctx
        .data
        .workflow_mut(id)
        .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", id))?;
    workflow.description = args.description;
    workflow.is_verification_needed = !args.no_verification;
    if let Some((unit, repeat_every, start)) = schedule {
        workflow.set_schedule(unit, repeat_every, start);
    }
    Ok(workflow.clone())
}

pub async fn handle_cycle(ctx: &mut CliContext, action: CycleAction) -> anyhow::Result<()> {
    match action {
        CycleAction::Create { workflow_id, title } => {
            let cycle = ctx.data.add_cycle(workflow_id, title)?;
            ctx.save().await?;
            output::output_success(&cycle);
        }
        CycleAction::End { id } => match ctx.data.cycle_mut(id) {
            Some(cycle) => {
                cycle.end();
                let cycle = cycle.clone();
                ctx.save().await?;
                output::output_success(&cycle);
            }
            None => return output::output_error(&format!("Cycle not found: {}", id)),
        },
    }
    Ok(())
}
