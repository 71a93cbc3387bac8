use dialoguer::Input;
use exchcal_core::{AuthPrompt, ExchError, ExchResult};
use owo_colors::OwoColorize;
use url::Url;

/// Browser sign-in driven from the terminal: print (and try to open) the
/// authorize URL, then read back the URL the browser was redirected to.
pub struct TerminalPrompt;

impl AuthPrompt for TerminalPrompt {
    fn redirect_response(&self, authorize_url: &Url) -> ExchResult<String> {
        println!("Open this URL in your browser to sign in:\n");
        println!("{}\n", authorize_url);

        if open::that(authorize_url.as_str()).is_err() {
            println!("(Could not open browser automatically, please copy the URL above)");
        }

        println!(
            "{}",
            "After signing in the browser shows a blank page. Paste its full address below.\n"
                .dimmed()
        );

        Input::<String>::new()
            .with_prompt("Redirect URL")
            .interact_text()
            .map_err(|e| ExchError::OAuth(format!("Failed to read the redirect URL: {e}")))
    }
}
