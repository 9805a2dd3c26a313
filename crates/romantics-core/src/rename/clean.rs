/// Split at the last `.`, the way a file's extension is usually read: leading
/// dots belong to the base, so `.bashrc` has no extension. The extension keeps
/// its dot.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(i) => name.split_at(leading + i),
        None => (name, ""),
    }
}

/// Normalize a file name: lower-case, spaces to dots, only `a-z 0-9 . -` kept
/// in the base, runs of dots collapsed, no dots at either end of the base.
/// The extension is lower-cased and otherwise left alone.
///
/// `My Game (USA) [v1.0].ROM` becomes `my.game.usa.v1.0.rom`.
///
/// When nothing of the base survives, the whole name goes through the base
/// rules instead, so `(!).SFC` becomes `sfc`. The result is always a fixed
/// point: cleaning it again changes nothing.
pub fn clean_filename(filename: &str) -> String {
    let (base, ext) = split_extension(filename);
    let cleaned = clean_base(base);
    if cleaned.is_empty() {
        return clean_base(filename);
    }
    format!("{}{}", cleaned, ext.to_lowercase())
}

fn clean_base(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    for c in base.to_lowercase().chars() {
        let c = if c == ' ' { '.' } else { c };
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-';
        if !keep || (c == '.' && out.ends_with('.')) {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('.').to_string()
}
