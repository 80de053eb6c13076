//! 服务端渲染的 HTML 页面：目录浏览、登录表单与错误页。

use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::listing::ListingPage;

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const FONT_AWESOME_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css";

const UPLOAD_SCRIPT: &str = r#"
const form = document.getElementById('uploadForm');
const input = document.getElementById('fileInput');
const dropZone = document.getElementById('dropZone');
const status = document.getElementById('uploadStatus');
function upload(files) {
    if (!files.length) return;
    const data = new FormData();
    data.append('directory', form.querySelector('input[name="directory"]').value);
    for (const file of files) data.append('files', file);
    status.classList.remove('hidden');
    status.textContent = 'Uploading ' + files.length + ' file(s)...';
    fetch('/upload', { method: 'POST', body: data, credentials: 'same-origin' })
        .then(res => { if (!res.ok) throw new Error(res.status); window.location.href = res.url; })
        .catch(() => { status.textContent = 'Upload failed. Please try again.'; });
}
dropZone.addEventListener('click', () => input.click());
input.addEventListener('change', () => upload(input.files));
dropZone.addEventListener('dragover', e => { e.preventDefault(); dropZone.classList.add('border-blue-500'); });
dropZone.addEventListener('dragleave', () => dropZone.classList.remove('border-blue-500'));
dropZone.addEventListener('drop', e => { e.preventDefault(); upload(e.dataTransfer.files); });
"#;

/// 把 URL 路径逐段编码并加上挂载前缀。
pub fn href_for(prefix: &str, url_path: &str) -> String {
    if url_path == "/" && !prefix.is_empty() {
        return prefix.to_string();
    }
    let encoded = url_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{prefix}{encoded}")
}

fn head(title: &str) -> Markup {
    html! {
        head {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            title { (title) }
            script src=(TAILWIND_CDN) {}
            link rel="stylesheet" href=(FONT_AWESOME_CSS);
        }
    }
}

/// 目录浏览页。
pub fn browser_page(
    page: &ListingPage,
    prefix: &str,
    qr_svg: Option<&str>,
    uploaded: Option<u64>,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            (head(&page.title))
            body class="bg-gray-50 min-h-screen" {
                div class="max-w-6xl mx-auto px-4 py-8" {
                    header class="mb-8" {
                        h1 class="text-3xl font-bold text-gray-900 mb-2" {
                            i class="fas fa-share-alt text-blue-600 mr-3" {}
                            "LanShare"
                        }
                        p class="text-gray-600 mb-4" {
                            "Current directory: "
                            code class="bg-gray-200 px-2 py-1 rounded" { (page.current_path) }
                        }
                        @if !page.server_url.is_empty() {
                            div class="bg-white rounded-lg shadow p-4 flex items-center gap-6" {
                                div {
                                    p class="text-sm text-gray-700 font-medium" { "Open on another device:" }
                                    p class="text-sm text-blue-600 font-mono break-all" { (page.server_url) }
                                }
                                @if let Some(svg) = qr_svg {
                                    div class="w-32 h-32 border rounded-lg" title="QR Code" {
                                        (PreEscaped(svg))
                                    }
                                }
                            }
                        }
                    }

                    @if let Some(count) = uploaded {
                        div class="bg-green-50 border border-green-200 text-green-700 px-4 py-3 rounded-lg mb-6" {
                            i class="fas fa-check-circle mr-2" {}
                            "Uploaded " (count) " file(s)."
                        }
                    }

                    section class="bg-white rounded-lg shadow p-6 mb-6" {
                        h2 class="text-lg font-semibold text-gray-900 mb-4" {
                            i class="fas fa-cloud-upload-alt text-blue-600 mr-2" {}
                            "Upload Files"
                        }
                        form id="uploadForm" enctype="multipart/form-data" method="POST" action="/upload" {
                            input type="hidden" name="directory" value=(page.current_path);
                            div id="dropZone" class="border-2 border-dashed border-gray-300 rounded-lg p-8 text-center cursor-pointer" {
                                i class="fas fa-cloud-upload-alt text-4xl text-gray-400 mb-4" {}
                                p class="text-gray-600" { "Drag & drop files here or click to select" }
                                input type="file" id="fileInput" name="files" multiple style="display: none;";
                            }
                            noscript {
                                button type="submit" class="mt-4 bg-blue-600 text-white px-4 py-2 rounded" { "Upload" }
                            }
                            p id="uploadStatus" class="text-sm text-gray-600 mt-2 hidden" { "Uploading..." }
                        }
                    }

                    section class="bg-white rounded-lg shadow overflow-hidden" {
                        table class="min-w-full divide-y divide-gray-200" {
                            thead class="bg-gray-50" {
                                tr {
                                    th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase" { "Name" }
                                    th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase" { "Size" }
                                    th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase" { "Modified" }
                                    th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase" { "Actions" }
                                }
                            }
                            tbody class="bg-white divide-y divide-gray-200" {
                                @if let Some(parent) = &page.parent_path {
                                    tr class="hover:bg-gray-50" {
                                        td class="px-6 py-4" colspan="4" {
                                            i class="fas fa-level-up-alt text-gray-500 mr-3" {}
                                            a href=(href_for(prefix, parent)) class="text-blue-600 font-medium" {
                                                ".. (Parent Directory)"
                                            }
                                        }
                                    }
                                }
                                @for entry in &page.entries {
                                    @let href = href_for(prefix, &entry.path);
                                    tr class="hover:bg-gray-50" {
                                        td class="px-6 py-4 whitespace-nowrap" {
                                            i class={ (entry.icon) " mr-3" } {}
                                            @if entry.is_dir {
                                                a href=(href) class="text-blue-600 font-medium" { (entry.name) }
                                            } @else {
                                                a href=(href) class="text-gray-900" { (entry.name) }
                                            }
                                        }
                                        td class="px-6 py-4 whitespace-nowrap text-sm text-gray-500" { (entry.size_label) }
                                        td class="px-6 py-4 whitespace-nowrap text-sm text-gray-500" {
                                            @if let Some(modified) = entry.modified {
                                                (modified.format("%Y-%m-%d %H:%M:%S").to_string())
                                            }
                                        }
                                        td class="px-6 py-4 whitespace-nowrap text-sm" {
                                            @if entry.is_dir {
                                                a href={ (href) "?download=zip" } class="text-gray-700 border border-gray-300 rounded-md px-3 py-1" {
                                                    i class="fas fa-file-archive mr-1" {}
                                                    "Zip"
                                                }
                                            } @else {
                                                a href={ (href) "?download=1" } class="text-white bg-blue-600 rounded-md px-3 py-1" {
                                                    i class="fas fa-download mr-1" {}
                                                    "Download"
                                                }
                                            }
                                        }
                                    }
                                }
                                @if page.entries.is_empty() {
                                    tr {
                                        td class="px-6 py-12 text-center text-gray-500" colspan="4" {
                                            i class="fas fa-folder-open text-4xl mb-4" {}
                                            p { "This directory is empty" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(UPLOAD_SCRIPT)) }
            }
        }
    }
}

/// 登录表单；`redirect` 为登录成功后返回的地址。
pub fn login_page(redirect: &str, error: Option<&str>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            (head("LanShare - Login"))
            body class="bg-gray-50 min-h-screen flex items-center justify-center" {
                div class="max-w-md w-full space-y-8 p-8" {
                    div class="text-center" {
                        i class="fas fa-shield-alt text-4xl text-blue-600 mb-4" {}
                        h2 class="text-3xl font-bold text-gray-900" { "Access Required" }
                        p class="mt-2 text-sm text-gray-600" { "Please enter the password to access LanShare" }
                    }
                    div class="bg-white rounded-lg shadow-md p-6" {
                        form method="POST" action="/login" class="space-y-6" {
                            input type="hidden" name="redirect" value=(redirect);
                            @if let Some(message) = error {
                                div class="bg-red-50 border border-red-200 text-red-600 px-4 py-3 rounded-lg" {
                                    i class="fas fa-exclamation-triangle mr-2" {}
                                    (message)
                                }
                            }
                            div {
                                label for="password" class="block text-sm font-medium text-gray-700 mb-2" { "Password" }
                                input type="password" id="password" name="password" required autofocus
                                    placeholder="Enter password"
                                    class="w-full px-4 py-3 border border-gray-300 rounded-lg";
                            }
                            button type="submit" class="w-full bg-blue-600 text-white py-3 px-4 rounded-lg font-medium" {
                                i class="fas fa-sign-in-alt mr-2" {}
                                "Access LanShare"
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    html! {
        (DOCTYPE)
        html lang="en" {
            (head(&title))
            body class="bg-gray-50 min-h-screen flex items-center justify-center" {
                div class="text-center" {
                    h1 class="text-3xl font-bold text-gray-900 mb-2" { (title) }
                    p class="text-gray-600 mb-4" { (message) }
                    a href="/" class="text-blue-600" { "Back to root" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingEntry, ListingPage};

    #[test]
    fn href_encodes_segments() {
        assert_eq!(href_for("", "/my docs/a#1.txt"), "/my%20docs/a%231.txt");
        assert_eq!(href_for("/files", "/"), "/files");
        assert_eq!(href_for("", "/"), "/");
    }

    #[test]
    fn login_page_escapes_redirect() {
        let markup = login_page("/\"><script>x</script>", Some("Invalid password."));
        let body = markup.into_string();
        assert!(!body.contains("<script>x</script>"));
        assert!(body.contains("Invalid password."));
    }

    #[test]
    fn browser_page_lists_entries_with_actions() {
        let page = ListingPage {
            title: "t".into(),
            current_path: "/sub".into(),
            parent_path: Some("/".into()),
            entries: vec![ListingEntry {
                name: "a.txt".into(),
                path: "/sub/a.txt".into(),
                size: 5,
                modified: None,
                is_dir: false,
                icon: "fas fa-file-alt text-gray-600",
                size_label: "5 B".into(),
            }],
            server_url: "http://10.0.0.2:8080".into(),
        };
        let body = browser_page(&page, "", Some("<svg></svg>"), Some(2)).into_string();
        assert!(body.contains("/sub/a.txt?download=1"));
        assert!(body.contains("(Parent Directory)"));
        assert!(body.contains("Uploaded 2 file(s)."));
        assert!(body.contains("<svg></svg>"));
        assert!(body.contains("http://10.0.0.2:8080"));
    }
}
