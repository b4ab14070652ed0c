/// Append the referral tag to an outbound product link.
///
/// An empty tag leaves the URL untouched. No URL validation happens here.
pub fn build_affiliate_link(url: &str, tag: &str) -> String {
    if tag.is_empty() {
        return url.to_string();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}tag={}", url, separator, tag)
}
