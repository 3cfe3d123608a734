//! Pulls YouTube and PDF links out of assistant prose into their own blocks.
//!
//! YouTube watch-URLs with a canonical 11-character video id become an embedded
//! player; anything else that looks like a watch-URL, and every `https://` URL
//! ending in `.pdf`, is rendered as an emoji-prefixed literal. Each match is
//! moved onto its own block so an embed never sits inline inside a sentence.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Length of a canonical YouTube video id
pub const YOUTUBE_ID_LEN: usize = 11;
pub const EMBED_WIDTH: u32 = 400;
pub const EMBED_HEIGHT: u32 = 225;
pub const VIDEO_EMOJI: &str = "🎥";
pub const DOCUMENT_EMOJI: &str = "📄";

lazy_static! {
    static ref YOUTUBE_RE: Regex =
        Regex::new(r"https://(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]+)")
            .expect("youtube watch-url regex is valid");
    static ref PDF_RE: Regex = Regex::new(r"https://\S+\.pdf").expect("pdf url regex is valid");
}

/// Rewrites every YouTube watch-URL, then every PDF URL, in `text`.
///
/// Text without matching URLs comes back unchanged.
pub fn rewrite_links(text: &str) -> String {
    let text = rewrite_youtube(text);
    rewrite_pdfs(&text).into_owned()
}

/// Embed URL for a YouTube video id
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

fn rewrite_youtube(text: &str) -> Cow<'_, str> {
    YOUTUBE_RE.replace_all(text, |caps: &Captures| {
        let url = &caps[0];
        let video_id = &caps[1];
        if video_id.len() == YOUTUBE_ID_LEN {
            video_embed(video_id)
        } else {
            format!("\n\n{} {}\n", VIDEO_EMOJI, url)
        }
    })
}

fn rewrite_pdfs(text: &str) -> Cow<'_, str> {
    PDF_RE.replace_all(text, |caps: &Captures| {
        format!("\n\n{} {}\n", DOCUMENT_EMOJI, &caps[0])
    })
}

fn video_embed(video_id: &str) -> String {
    format!(
        "\n\n<iframe width=\"{}\" height=\"{}\" src=\"{}\" title=\"YouTube video\" frameborder=\"0\" allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture\" allowfullscreen></iframe>\n",
        EMBED_WIDTH,
        EMBED_HEIGHT,
        embed_url(video_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_unchanged() {
        let text = "Photosynthesis turns light into chemical energy. See [1].\nhttp://example.com/notes";
        assert_eq!(rewrite_links(text), text);
        assert_eq!(rewrite_links(""), "");
    }

    #[test]
    fn test_canonical_video_becomes_embed() {
        let text = "Watch https://www.youtube.com/watch?v=dQw4w9WgXcQ for an overview.";
        let out = rewrite_links(text);

        assert!(out.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(!out.contains("watch?v="));
        assert!(out.contains("width=\"400\" height=\"225\""));
        assert!(out.contains("allowfullscreen"));
        assert!(out.contains("picture-in-picture"));
        assert!(out.starts_with("Watch \n\n<iframe"));
        assert!(out.ends_with("</iframe>\n for an overview."));
    }

    #[test]
    fn test_video_without_www() {
        let out = rewrite_links("https://youtube.com/watch?v=abcdefghijk");
        assert!(out.contains("/embed/abcdefghijk"));
    }

    #[test]
    fn test_non_canonical_id_stays_literal() {
        for url in [
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=abcdefghijkl",
        ] {
            let out = rewrite_links(&format!("Try {} now", url));
            assert!(out.contains(&format!("🎥 {}", url)), "{}", out);
            assert!(!out.contains("<iframe"));
            assert!(!out.contains("/embed/"));
        }
    }

    #[test]
    fn test_pdf_becomes_literal_block() {
        let text = "Read https://example.edu/notes/calculus.pdf before class.";
        let out = rewrite_links(text);
        assert_eq!(
            out,
            "Read \n\n📄 https://example.edu/notes/calculus.pdf\n before class."
        );
    }

    #[test]
    fn test_multiple_matches_all_rewritten() {
        let text = "A https://www.youtube.com/watch?v=aaaaaaaaaaa B https://www.youtube.com/watch?v=bbbbbbbbbbb C https://x.org/1.pdf D https://x.org/2.pdf";
        let out = rewrite_links(text);
        assert_eq!(out.matches("<iframe").count(), 2);
        assert!(out.contains("/embed/aaaaaaaaaaa"));
        assert!(out.contains("/embed/bbbbbbbbbbb"));
        assert!(out.contains("📄 https://x.org/1.pdf"));
        assert!(out.contains("📄 https://x.org/2.pdf"));
        assert!(out.starts_with("A "));
        assert!(out.ends_with("\n"));
    }

    #[test]
    fn test_markdown_link_wrapping() {
        // The closing parenthesis is part of the non-whitespace run but the
        // match still ends at the last ".pdf".
        let out = rewrite_links("[Guide](https://x.org/guide.pdf)");
        assert_eq!(out, "[Guide](\n\n📄 https://x.org/guide.pdf\n)");
    }

    #[test]
    fn test_no_double_rewrite_between_passes() {
        let text = "https://www.youtube.com/watch?v=abcdefghijk&list=a.pdf";
        let out = rewrite_links(text);
        assert_eq!(out.matches("<iframe").count(), 1);
        assert!(!out.contains("📄 https://www.youtube.com"));

        let out = rewrite_links("https://www.youtube.com/watch?v=abc.pdf");
        assert!(out.contains("🎥 https://www.youtube.com/watch?v=abc\n"));
        assert!(!out.contains("📄"));
    }

    #[test]
    fn test_malformed_urls_pass_through() {
        let text = "http://www.youtube.com/watch?v=dQw4w9WgXcQ and https://youtube.com/watch?x=1 and http://a.org/b.pdf";
        assert_eq!(rewrite_links(text), text);
    }

    #[test]
    fn test_embed_output_is_stable_under_second_pass() {
        let once = rewrite_links("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(rewrite_links(&once), once);
    }
}
