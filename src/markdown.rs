use pulldown_cmark::{Options, Parser, html};

/// Render a recipe body to an HTML snippet.
pub fn render_html(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(body, options);
    let mut output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}
