use crate::cli::CalendarAction;
use crate::context::CliContext;
use crate::output;
use grc_domain::CalendarEventBuilder;

pub async fn handle(ctx: &mut CliContext, action: CalendarAction) -> anyhow::Result<()> {
    match action {
        CalendarAction::Build { today } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let summary = CalendarEventBuilder::new(&ctx.config).build_cycle_tasks(&mut ctx.data, today);
            ctx.save().await?;
            output::output_success(&summary);
        }
        CalendarAction::List => {
            output::output_list(ctx.data.calendar_events.clone());
        }
    }
    Ok(())
}
