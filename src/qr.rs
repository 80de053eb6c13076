//! 把服务地址渲染成二维码（终端字符画与内联 SVG）。

use qrcodegen::{QrCode, QrCodeEcc};
use std::fmt::Write;

const QUIET_ZONE: i32 = 2;

fn encode(text: &str) -> Option<QrCode> {
    QrCode::encode_text(text, QrCodeEcc::Medium).ok()
}

fn is_dark(qr: &QrCode, x: i32, y: i32) -> bool {
    // get_module 对越界坐标返回 false，静区自然为白色
    qr.get_module(x, y)
}

/// 使用半块字符渲染，一行字符对应两行模块。
pub fn render_terminal(text: &str) -> Option<String> {
    let qr = encode(text)?;
    let size = qr.size();
    let mut out = String::new();
    let mut y = -QUIET_ZONE;
    while y < size + QUIET_ZONE {
        for x in -QUIET_ZONE..size + QUIET_ZONE {
            let top = is_dark(&qr, x, y);
            let bottom = is_dark(&qr, x, y + 1);
            out.push(match (top, bottom) {
                (true, true) => ' ',
                (true, false) => '▄',
                (false, true) => '▀',
                (false, false) => '█',
            });
        }
        out.push('\n');
        y += 2;
    }
    Some(out)
}

/// 生成可直接嵌入页面的 SVG。
pub fn render_svg(text: &str, size_px: u32) -> Option<String> {
    let qr = encode(text)?;
    let modules = qr.size() + 2 * QUIET_ZONE;
    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size_px}" height="{size_px}" viewBox="0 0 {modules} {modules}" shape-rendering="crispEdges">"#
    );
    svg.push_str(r##"<rect width="100%" height="100%" fill="#ffffff"/><path fill="#000000" d=""##);
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if qr.get_module(x, y) {
                let _ = write!(svg, "M{},{}h1v1h-1z", x + QUIET_ZONE, y + QUIET_ZONE);
            }
        }
    }
    svg.push_str(r#""/></svg>"#);
    Some(svg)
}
