use qrcode::{
    render::{svg, unicode},
    EcLevel, QrCode,
};

// ~250px and level M match what pairing apps expect to scan from a screen.
pub fn render_svg(payload: &str) -> anyhow::Result<String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
    Ok(code
        .render()
        .min_dimensions(250, 250)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

pub fn render_terminal(payload: &str) -> anyhow::Result<String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .quiet_zone(false)
        .build())
}
