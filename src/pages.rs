// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Server-rendered HTML pages.
//!
//! Every user-controlled value passes through [`html_escape`] before it is
//! placed in markup.

/// Escape text for HTML element content and quoted attribute values.
pub fn html_escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

const DENIED_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; text-align: center; background-color: #f5f5f5; }
        .container { background: white; padding: 2rem; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        h1 { color: #e74c3c; margin-bottom: 1rem; }
        .message { margin: 1rem 0; color: #666; }
        .token-form { margin: 2rem 0; padding: 1rem; background: #f8f9fa; border-radius: 4px; }
        input[type="text"] { width: 100%; padding: 8px; margin: 8px 0; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }
        button { background: #3498db; color: white; border: none; padding: 10px 20px; border-radius: 4px; cursor: pointer; }
        button:hover { background: #2980b9; }
        .error { color: #e74c3c; margin: 1rem 0; }
        .help { color: #666; font-size: 0.9rem; margin-top: 2rem; }
"#;

/// The access-required page, optionally echoing a rejected token.
pub fn access_denied(invalid_token: Option<&str>, port: Option<&str>) -> String {
    let notice = match invalid_token.filter(|t| !t.is_empty()) {
        Some(token) => format!(
            "<div class=\"error\">Invalid access token provided:<br><code>{}</code></div>",
            html_escape(token)
        ),
        None => "<div class=\"message\">This portfolio is private. Please use the access link provided by the owner.</div>"
            .to_string(),
    };
    let port = html_escape(port.unwrap_or("80"));

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Access Required</title>
    <style>{DENIED_STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Access Required</h1>
        {notice}
        <div class="token-form">
            <form id="tokenForm">
                <input type="text" id="token" placeholder="Enter your access token" required>
                <button type="submit">View Portfolio</button>
            </form>
        </div>
        <div class="help">
            <p>Need access? Ask the portfolio owner for an access link.</p>
            <p>Make sure you're using the correct port: {port}</p>
        </div>
    </div>
    <script>
        document.getElementById('tokenForm').addEventListener('submit', function (event) {{
            event.preventDefault();
            const token = document.getElementById('token').value.trim();
            if (token) {{
                window.location.href = '/access?token=' + encodeURIComponent(token);
            }}
        }});
        if (window.self !== window.top) {{
            window.top.location.href = window.location.href;
        }}
    </script>
</body>
</html>
"#
    )
}

/// Page shown to in-app browsers that may not keep the access cookie.
pub fn embedded_browser_access(host: &str, token: &str) -> String {
    let link = format!(
        "http://{}/access?token={}",
        host,
        urlencoding::encode(token)
    );
    let link = html_escape(&link);
    let token = html_escape(token);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Portfolio Access</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; line-height: 1.6; }}
        .container {{ max-width: 600px; margin: 0 auto; }}
        .warning {{ color: #721c24; background: #f8d7da; padding: 15px; border-radius: 4px; margin: 20px 0; }}
        .token {{ background: #e9ecef; padding: 10px; border-radius: 4px; word-break: break-all; margin: 10px 0; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>In-App Browser Detected</h1>
        <div class="warning">
            <p>This in-app browser may not keep you signed in.</p>
            <p>Please either:</p>
            <ol>
                <li>Copy and open this link in Chrome or Safari:<br>
                    <div class="token"><a href="{link}">{link}</a></div>
                </li>
                <li>Or use this token on the access page:<br>
                    <div class="token">{token}</div>
                </li>
            </ol>
        </div>
    </div>
</body>
</html>
"#
    )
}
