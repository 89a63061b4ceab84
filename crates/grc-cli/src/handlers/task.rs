use crate::cli::{TaskAction, TaskUpdateArgs};
use crate::context::CliContext;
use crate::output;
use grc_domain::{
    CycleTaskGroupObjectTask, CycleTaskUpdate, FieldUpdate, TaskStatus, TASK_ASSIGNEES,
    TASK_SECONDARY_ASSIGNEES,
};

pub async fn handle(ctx: &mut CliContext, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Create { cycle_id, title, due } => {
            let task = ctx.data.add_cycle_task(cycle_id, title, due)?;
            ctx.save().await?;
            output::output_success(&task);
        }
        TaskAction::List { cycle_id } => {
            let tasks: Vec<CycleTaskGroupObjectTask> = ctx
                .data
                .cycle_tasks
                .iter()
                .filter(|t| cycle_id.map_or(true, |id| t.cycle_id == id))
                .cloned()
                .collect();
            output::output_list(tasks);
        }
        TaskAction::Update(args) => {
            let task = handle_update(ctx, args)?;
            ctx.save().await?;
            output::output_success(&task);
        }
        TaskAction::Assign {
            id,
            email,
            secondary,
        } => {
            let person_id = match ctx.data.person_by_email(&email) {
                Some(person) => person.id,
                None => return output::output_error(&format!("Person not found: {}", email)),
            };
            let role = if secondary {
                TASK_SECONDARY_ASSIGNEES
            } else {
                TASK_ASSIGNEES
            };
            let task = match ctx.data.cycle_task_mut(id) {
                Some(task) => {
                    task.add_person_to_role(role, person_id);
                    task.clone()
                }
                None => return output::output_error(&format!("Task not found: {}", id)),
            };
            ctx.save().await?;
            output::output_success(&task);
        }
    }
    Ok(())
}

fn handle_update(ctx: &mut CliContext, args: TaskUpdateArgs) -> anyhow::Result<CycleTaskGroupObjectTask> {
    let status = args
        .status
        .map(|s| s.parse::<TaskStatus>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let description = if args.clear_description {
        FieldUpdate::Clear
    } else {
        args.description
            .map(FieldUpdate::Set)
            .unwrap_or(FieldUpdate::NoChange)
    };
    let updates = CycleTaskUpdate {
        title: args.title,
        description,
        status,
        start_date: args.start.map(FieldUpdate::Set).unwrap_or(FieldUpdate::NoChange),
        end_date: args.due,
    };

    let task = ctx
        .data
        .cycle_task_mut(args.id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", args.id))?;
    task.update(updates);
    Ok(task.clone())
}
