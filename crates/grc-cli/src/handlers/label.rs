use crate::cli::LabelAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &mut CliContext, action: LabelAction) -> anyhow::Result<()> {
    match action {
        LabelAction::Create { title, context_id } => {
            let label = ctx.data.add_label(title, context_id)?;
            ctx.save().await?;
            output::output_success(&label);
        }
        LabelAction::List => {
            output::output_list(ctx.data.labels.clone());
        }
    }
    Ok(())
}
