use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("connection refused") || msg.contains("error sending request") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check that the WebDriver and the SMTP relay are running.");
        eprintln!("  {} chromedriver --port=9515", "$".dimmed());
    }

    if msg.contains("settings file") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Fix or remove the file passed with --config / VISITBOT_CONFIG.");
    }

    std::process::exit(1);
}
