// Argument builder - selected format codes + template into one backend argument string

/// Format selector fragment for yt-dlp (`-f 137+140`).
///
/// Empty codes are skipped; no codes means no fragment.
pub fn format_fragment<S: AsRef<str>>(codes: &[S]) -> String {
    let picked: Vec<&str> = codes
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| !c.is_empty())
        .collect();

    if picked.is_empty() {
        String::new()
    } else {
        format!("-f {}", picked.join("+"))
    }
}

/// Compose the argument string sent with every request.
///
/// The template follows a single space verbatim, even when it is empty,
/// so `build(&[] as &[&str], "")` is `" "`. The backend tolerates the
/// stray whitespace.
pub fn build<S: AsRef<str>>(codes: &[S], template: &str) -> String {
    format!("{} {}", format_fragment(codes), template)
}

/// Join the persisted download template with the user's custom args
pub fn compose_template(download_template: &str, custom_args: Option<&str>) -> String {
    match custom_args.map(str::trim).filter(|a| !a.is_empty()) {
        Some(extra) if download_template.is_empty() => extra.to_string(),
        Some(extra) => format!("{} {}", download_template, extra),
        None => download_template.to_string(),
    }
}
