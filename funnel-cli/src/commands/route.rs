use crate::config::ConfigLoader;
use anyhow::Result;
use clap::Args;
use funnel_core::{Actor, LocalIdentity, NavigationDecision, NavigationGuard, NavigationRequest};

#[derive(Args)]
pub struct RouteArgs {
    /// Location the user is on, e.g. `/goal`
    pub from: String,

    /// Location the user wants, query included, e.g. `/payment?skip=payment`
    pub to: String,

    /// Check as this signed-in user; omit to check anonymously
    #[arg(long)]
    pub user: Option<String>,
}

pub fn run(args: RouteArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let guard = NavigationGuard::from_config(&config.navigation)?;

    let identity = match args.user {
        Some(id) => LocalIdentity::signed_in(Actor::new(id)),
        None => LocalIdentity::anonymous(),
    };

    let request = NavigationRequest::from_locations(&args.from, &args.to);
    let decision = guard.check(&request, &identity);
    println!("{}", describe(&request, decision));
    Ok(())
}

fn describe(request: &NavigationRequest, decision: NavigationDecision) -> String {
    match decision.redirect_target() {
        None => format!("{} -> {}: allowed", request.from, request.to),
        Some(target) => format!(
            "{} -> {}: redirect to {}",
            request.from,
            request.to,
            target.path()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_core::FunnelStep;

    #[test]
    fn test_describe_allow_and_redirect() {
        let request = NavigationRequest::new("/goal", "/quiz");
        assert_eq!(
            describe(&request, NavigationDecision::Allow),
            "/goal -> /quiz: allowed"
        );
        assert_eq!(
            describe(&request, NavigationDecision::RedirectTo(FunnelStep::Payment)),
            "/goal -> /quiz: redirect to /payment"
        );
        assert_eq!(
            describe(&request, NavigationDecision::RedirectToEntry),
            "/goal -> /quiz: redirect to /"
        );
    }
}
