//! Codec preference rewrite applied to remote session descriptions.

/// Moves the payload types of `codec` to the front of the format list of the
/// first `m=<media>` line, keeping every other format as fallback in its
/// original order.
///
/// The rewrite is deterministic and idempotent. The SDP is returned unchanged
/// when the media section or the codec is missing. Line endings (`\r\n` or
/// `\n`) are preserved.
pub fn prefer_codec(sdp: &str, codec: &str, media: &str) -> String {
    let separator = if sdp.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = sdp.split(separator).collect();

    let media_prefix = format!("m={media} ");
    let Some(m_index) = lines.iter().position(|l| l.starts_with(&media_prefix)) else {
        return sdp.to_owned();
    };

    let section_end = lines[m_index + 1..]
        .iter()
        .position(|l| l.starts_with("m="))
        .map_or(lines.len(), |offset| m_index + 1 + offset);

    let preferred: Vec<&str> = lines[m_index + 1..section_end]
        .iter()
        .filter_map(|l| rtpmap_payload_type(l, codec))
        .collect();
    if preferred.is_empty() {
        return sdp.to_owned();
    }

    let Some(rewritten) = reorder_formats(lines[m_index], &preferred) else {
        return sdp.to_owned();
    };
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| if i == m_index { rewritten.as_str() } else { *line })
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn prefer_video_codec(sdp: &str, codec: &str) -> String {
    prefer_codec(sdp, codec, "video")
}

// `a=rtpmap:<pt> <encoding>/<clock>[/<channels>]`
fn rtpmap_payload_type<'a>(line: &'a str, codec: &str) -> Option<&'a str> {
    let rest = line.strip_prefix("a=rtpmap:")?;
    let (payload_type, encoding) = rest.split_once(' ')?;
    let name = encoding.split('/').next()?;
    let numeric = !payload_type.is_empty() && payload_type.bytes().all(|b| b.is_ascii_digit());
    (numeric && name.eq_ignore_ascii_case(codec)).then_some(payload_type)
}

// `m=<media> <port> <proto> <fmt> ...`
fn reorder_formats(media_line: &str, preferred: &[&str]) -> Option<String> {
    let fields: Vec<&str> = media_line.split(' ').collect();
    if fields.len() <= 3 {
        return None;
    }
    let (header, formats) = fields.split_at(3);

    let mut out: Vec<&str> = header.to_vec();
    out.extend(preferred.iter().copied().filter(|pt| formats.contains(pt)));
    out.extend(formats.iter().copied().filter(|f| !preferred.contains(f)));
    Some(out.join(" "))
}
