use crate::cli::PersonAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &mut CliContext, action: PersonAction) -> anyhow::Result<()> {
    match action {
        PersonAction::Create { email, name } => {
            let person = ctx.data.add_person(email, name)?;
            ctx.save().await?;
            output::output_success(&person);
        }
        PersonAction::List => {
            output::output_list(ctx.data.people.clone());
        }
    }
    Ok(())
}
