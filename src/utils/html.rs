/// Sanitizes free-text rich fields (question explanations, subject
/// descriptions) with ammonia's whitelist: safe formatting tags survive,
/// scripts, iframes and event-handler attributes are stripped.
///
/// Prompts and options are stored verbatim; they routinely contain code
/// such as `a < b` that sanitizing would mangle, and clients render them as
/// text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
