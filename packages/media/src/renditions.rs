//! Rendition ladder selection and the filter strings derived from it.

use transcode_core::Variant;

/// Common adaptive streaming resolutions and bitrates, largest first.
pub fn default_ladder() -> Vec<Variant> {
    vec![
        Variant::new("1080p", 1920, 1080, "5000k", "192k"),
        Variant::new("720p", 1280, 720, "3000k", "128k"),
        Variant::new("360p", 640, 360, "1000k", "96k"),
    ]
}

/// Keep the renditions no larger than the source.
///
/// When nothing fits, the last (smallest) entry of the ladder is used so a
/// low-resolution source still gets one output.
pub fn select_renditions(src_width: u32, src_height: u32, ladder: &[Variant]) -> Vec<Variant> {
    let selected: Vec<Variant> = ladder
        .iter()
        .filter(|r| r.fits_within(src_width, src_height))
        .cloned()
        .collect();

    if selected.is_empty() {
        return ladder.last().cloned().into_iter().collect();
    }
    selected
}

/// Split the first video stream once per rendition and scale each branch.
pub fn filter_complex(selected: &[Variant]) -> String {
    let outputs: String = (0..selected.len()).map(|i| format!("[v{i}]")).collect();
    let scales: Vec<String> = selected
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[v{i}]scale=w={}:h={}:force_original_aspect_ratio=decrease[v{i}out]",
                r.width, r.height
            )
        })
        .collect();

    format!("[0:v]split={}{};{}", selected.len(), outputs, scales.join(";"))
}

/// Pair every video output with its audio output for the HLS muxer.
pub fn var_stream_map(selected: &[Variant]) -> String {
    (0..selected.len())
        .map(|i| format!("v:{i},a:{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}
