use anyhow::Result;
use exchcal_core::Settings;
use owo_colors::OwoColorize;

pub fn run(settings: &Settings) -> Result<()> {
    let oauth = &settings.oauth;

    println!("{}", "Paths".bold());
    println!("  OAuth config:  {}", settings.oauth_config_file.display());
    println!("  Token:         {}", settings.token_file.display());
    println!("  Netrc:         {}", settings.netrc_file.display());

    println!();
    println!("{}", "Account".bold());
    println!("  Mailbox:       {}", settings.account);
    println!("  Login:         {}", settings.login.as_deref().unwrap_or("-"));

    println!();
    println!("{}", "OAuth".bold());
    println!("  Tenant:        {}", oauth.tenant_id);
    println!("  Client:        {}", oauth.client_id);
    println!("  Secret:        {}", redact(&oauth.client_secret));
    println!("  Scope:         {}", oauth.scope.join(" "));
    println!("  Authority:     {}", oauth.authority);
    println!("  API:           {}", oauth.api_base);

    println!();
    println!("{}", "Classes".bold());
    for (label, pattern) in settings.regex_map.patterns() {
        println!("  {:<12} {}", label, pattern.dimmed());
    }

    Ok(())
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "(not set)" } else { "********" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_never_printed() {
        assert_eq!(redact("abc123"), "********");
        assert_eq!(redact(""), "(not set)");
    }
}
