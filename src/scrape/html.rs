use once_cell::sync::Lazy;
use regex::Regex;

use crate::textutil::collapse_ws;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("title"));
static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attr")
});
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("style"));
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment"));
static P_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("p"));
static DIV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<div\b[^>]*>(.*?)</div\s*>").expect("div"));
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)</?([a-zA-Z][a-zA-Z0-9]*)?[^>]*>").expect("tag"));
static OPEN_OR_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)([a-z][a-z0-9]*)\b[^>]*>").expect("open/close"));

/// Attributes of one start tag, names lowercased.
pub fn tag_attrs(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?;
            Some((name, decode_entities(value.as_str())))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s)
        .replace('\u{a0}', " ")
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Visible text of a fragment on one line. Inline tags vanish without a
/// trace; block boundaries become a space.
pub fn strip_tags(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, |c: &regex::Captures<'_>| {
        let inline = c
            .get(1)
            .is_some_and(|name| !BLOCK_TAGS.iter().any(|b| name.as_str().eq_ignore_ascii_case(b)));
        if inline {
            ""
        } else {
            " "
        }
    });
    collapse_ws(&decode_entities(&without_tags))
}

/// `og:title` when present, otherwise `<title>`.
pub fn page_title(html: &str) -> Option<String> {
    let og = META_RE.find_iter(html).find_map(|m| {
        let attrs = tag_attrs(m.as_str());
        let key = attr(&attrs, "property").or_else(|| attr(&attrs, "name"))?;
        if key.eq_ignore_ascii_case("og:title") {
            attr(&attrs, "content").map(collapse_ws)
        } else {
            None
        }
    });
    og.filter(|t| !t.is_empty()).or_else(|| {
        TITLE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| strip_tags(m.as_str()))
            .filter(|t| !t.is_empty())
    })
}

/// Source URL declared by the page itself (`og:url`, then canonical link).
pub fn page_url(html: &str) -> Option<String> {
    let og = META_RE.find_iter(html).find_map(|m| {
        let attrs = tag_attrs(m.as_str());
        let key = attr(&attrs, "property").or_else(|| attr(&attrs, "name"))?;
        if key.eq_ignore_ascii_case("og:url") {
            attr(&attrs, "content").map(|s| s.trim().to_string())
        } else {
            None
        }
    });
    og.filter(|u| !u.is_empty()).or_else(|| {
        LINK_RE.find_iter(html).find_map(|m| {
            let attrs = tag_attrs(m.as_str());
            let rel = attr(&attrs, "rel")?;
            if rel.eq_ignore_ascii_case("canonical") {
                attr(&attrs, "href")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            } else {
                None
            }
        })
    })
}

/// Lowercased host of an absolute URL, without port or credentials.
pub fn host_of(url: &str) -> Option<String> {
    let rest = url.trim().split_once("://").map(|(_, r)| r)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?.trim().to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Inner HTML of the first element whose id or class list names `key`,
/// matched to its own closing tag.
pub fn element_inner_html<'a>(html: &'a str, key: &str) -> Option<&'a str> {
    for caps in OPEN_OR_CLOSE_RE.captures_iter(html) {
        if !caps[1].is_empty() {
            continue;
        }
        let whole = caps.get(0)?;
        let attrs = tag_attrs(whole.as_str());
        let id_hit = attr(&attrs, "id").is_some_and(|v| v.trim() == key);
        let class_hit =
            attr(&attrs, "class").is_some_and(|v| v.split_whitespace().any(|c| c == key));
        if !(id_hit || class_hit) {
            continue;
        }
        let end = matching_close(html, whole.end(), &caps[2])?;
        return Some(&html[whole.end()..end]);
    }
    None
}

fn matching_close(html: &str, from: usize, tag: &str) -> Option<usize> {
    let mut depth = 1usize;
    for caps in OPEN_OR_CLOSE_RE.captures_iter(&html[from..]) {
        if !caps[2].eq_ignore_ascii_case(tag) {
            continue;
        }
        let whole = caps.get(0)?;
        if caps[1].is_empty() {
            if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(from + whole.start());
            }
        }
    }
    None
}

/// Paragraph texts of a content container: `<p>` first, then `<div>`,
/// then `<br>`-separated lines.
pub fn paragraphs(inner_html: &str) -> Vec<String> {
    let cleaned = COMMENT_RE.replace_all(inner_html, "");
    let cleaned = SCRIPT_RE.replace_all(&cleaned, "");
    let cleaned = STYLE_RE.replace_all(&cleaned, "").into_owned();

    let from_p: Vec<String> = P_RE
        .captures_iter(&cleaned)
        .map(|c| strip_tags(&c[1]))
        .filter(|t| !t.is_empty())
        .collect();
    if !from_p.is_empty() {
        return from_p;
    }

    let from_div: Vec<String> = DIV_RE
        .captures_iter(&cleaned)
        .map(|c| strip_tags(&c[1]))
        .filter(|t| !t.is_empty())
        .collect();
    if !from_div.is_empty() {
        return from_div;
    }

    BR_RE
        .replace_all(&cleaned, "\n")
        .lines()
        .map(strip_tags)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<title>서울 생존기 12화 &gt; 북토끼</title>
<meta property="og:title" content="서울 생존기 12화">
<meta property='og:url' content='https://booktoki468.com/novel/123?page=2'>
</head><body>
<div class="nav"><p>menu</p></div>
<div id="novel_content">
  <div class="ad"><script>var x = "<p>no</p>";</script></div>
  <div>
    <p>첫 번째 문장.</p>
    <p>   </p>
    <p>두 번째 &amp; <b>문장</b>.</p>
  </div>
</div>
<p>footer</p>
</body></html>"#;

    #[test]
    fn title_prefers_og_title() {
        assert_eq!(page_title(PAGE).as_deref(), Some("서울 생존기 12화"));
        let plain = "<html><head><title> 무림  검객 3화 </title></head></html>";
        assert_eq!(page_title(plain).as_deref(), Some("무림 검객 3화"));
        assert_eq!(page_title("<html></html>"), None);
    }

    #[test]
    fn url_and_host() {
        let url = page_url(PAGE).expect("url");
        assert_eq!(host_of(&url).as_deref(), Some("booktoki468.com"));
        let canonical = r#"<link href="http://WWW.Example.com:8080/a" rel="canonical">"#;
        assert_eq!(
            page_url(canonical).and_then(|u| host_of(&u)).as_deref(),
            Some("www.example.com")
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn content_container_is_matched_to_its_own_close_tag() {
        let inner = element_inner_html(PAGE, "novel_content").expect("container");
        assert!(inner.contains("첫 번째"));
        assert!(!inner.contains("footer"));
        assert_eq!(
            paragraphs(inner),
            vec!["첫 번째 문장.".to_string(), "두 번째 & 문장.".to_string()]
        );
    }

    #[test]
    fn falls_back_to_divs_then_line_breaks() {
        let divs = r#"<div id="c"><div>하나</div><div><br></div><div>둘</div></div>"#;
        let inner = element_inner_html(divs, "c").unwrap();
        assert_eq!(paragraphs(inner), vec!["하나", "둘"]);

        let brs = r#"<section class="body c">첫 줄<br>둘째 줄<br/><br/>셋째</section>"#;
        let inner = element_inner_html(brs, "c").unwrap();
        assert_eq!(paragraphs(inner), vec!["첫 줄", "둘째 줄", "셋째"]);
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        assert_eq!(
            paragraphs("<p>그는 <b>천천히</b>, 문을 열었다.</p><p>Hel<i>lo</i></p>"),
            vec!["그는 천천히, 문을 열었다.", "Hello"]
        );
        assert_eq!(strip_tags("하나<br>둘<div>셋</div>넷"), "하나 둘 셋 넷");
        assert_eq!(strip_tags("<span class=\"x\">말</span><!-- c -->끝"), "말 끝");
    }

    #[test]
    fn missing_container() {
        assert!(element_inner_html(PAGE, "nope").is_none());
    }
}
