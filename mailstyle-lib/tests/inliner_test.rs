use mailstyle_lib::{CssInliner, InlinerError};

#[cfg(test)]
pub mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn inline_body(html: &str, css: &str) -> String {
        init_logging();
        let mut inliner = CssInliner::from_html(html);
        inliner.inline_css(css).unwrap();
        inliner.render_body_content().unwrap()
    }

    fn inline_document(html: &str, css: &str) -> String {
        init_logging();
        let mut inliner = CssInliner::from_html(html);
        inliner.inline_css(css).unwrap();
        inliner.render().unwrap()
    }

    #[test]
    fn more_specific_selector_wins_regardless_of_source_order() {
        let html = r#"<p id="a" class="a b c"></p>"#;
        let expected = r#"<p id="a" class="a b c" style="color: red;"></p>"#;
        assert_eq!(inline_body(html, "#a { color: red } .a.b.c { color: blue }"), expected);
        assert_eq!(inline_body(html, ".a.b.c { color: blue } #a { color: red }"), expected);
        assert_eq!(
            inline_body(html, "#a { color: red } p.a.b.c { color: blue } p { color: green }"),
            expected
        );
    }

    #[test]
    fn later_rule_wins_at_equal_specificity() {
        let html = r#"<p class="a b"></p>"#;
        assert_eq!(
            inline_body(html, ".a { color: red } .b { color: blue }"),
            r#"<p class="a b" style="color: blue;"></p>"#
        );
        assert_eq!(
            inline_body(html, ".b { color: blue } .a { color: red }"),
            r#"<p class="a b" style="color: red;"></p>"#
        );
    }

    #[test]
    fn important_declarations_take_precedence() {
        assert_eq!(
            inline_body("<p id=\"x\"></p>", "p { color: red !important } #x { color: blue }"),
            r#"<p id="x" style="color: red;"></p>"#
        );
        assert_eq!(
            inline_body("<p></p>", "p { color: red !important } p { color: blue !important }"),
            r#"<p style="color: blue;"></p>"#
        );
        assert_eq!(
            inline_body("<p></p>", "p { color: red !important; margin: 0 } p { padding: 0 }"),
            r#"<p style="margin: 0; padding: 0; color: red;"></p>"#
        );
    }

    #[test]
    fn disallowed_media_is_dropped_entirely() {
        assert_eq!(
            inline_document(
                "<html><body><p></p></body></html>",
                "@media tv { p { color: red } }"
            ),
            "<html><head></head><body><p></p></body></html>"
        );
    }

    #[test]
    fn allowed_media_is_kept_but_not_inlined() {
        init_logging();
        let mut inliner = CssInliner::from_html("<html><body><p></p></body></html>");
        inliner.inline_css("@media screen { p { color: red } }").unwrap();
        assert_eq!(
            inliner.render().unwrap(),
            "<html><head><style type=\"text/css\">@media screen{p{color: red}}</style></head>\
             <body><p></p></body></html>"
        );
        assert_eq!(inliner.matching_uninlinable_selectors().unwrap(), vec!["p".to_string()]);
    }

    #[test]
    fn media_types_can_be_added_and_removed() {
        init_logging();
        let css = "@media tv { p { color: red } } @media print { p { color: black } }";
        let mut inliner = CssInliner::from_html("<p></p>");
        inliner
            .add_allowed_media_type("TV")
            .remove_allowed_media_type("print")
            .inline_css(css)
            .unwrap();
        assert_eq!(
            inliner.render().unwrap(),
            "<html><head><style type=\"text/css\">@media tv{p{color: red}}</style></head>\
             <body><p></p></body></html>"
        );
    }

    #[test]
    fn media_rules_without_matching_elements_are_dropped() {
        assert_eq!(
            inline_document("<p></p>", "@media screen { h1 { color: red } }"),
            "<html><head></head><body><p></p></body></html>"
        );
    }

    #[test]
    fn import_rules_survive_and_rules_are_inlined() {
        assert_eq!(
            inline_document(
                "<html><body><p>a</p><p>b</p></body></html>",
                "@import \"foo.css\"; p { color: green; }"
            ),
            "<html><head><style type=\"text/css\">@import \"foo.css\"; </style></head>\
             <body><p style=\"color: green;\">a</p><p style=\"color: green;\">b</p></body></html>"
        );
    }

    #[test]
    fn excluded_elements_get_no_inline_style() {
        init_logging();
        let css = "p { margin: 0; }";
        let mut inliner = CssInliner::from_html("<p class=\"x\"></p>");
        inliner.add_excluded_selector(" p.x ").inline_css(css).unwrap();
        assert_eq!(inliner.render_body_content().unwrap(), "<p class=\"x\"></p>");

        inliner.remove_excluded_selector("p.x").inline_css(css).unwrap();
        assert_eq!(
            inliner.render_body_content().unwrap(),
            "<p class=\"x\" style=\"margin: 0;\"></p>"
        );
    }

    #[test]
    fn two_paragraphs_without_residual_stylesheet() {
        assert_eq!(
            inline_document("<html><p></p><p></p></html>", "p { color: red; }"),
            "<html><head></head><body>\
             <p style=\"color: red;\"></p><p style=\"color: red;\"></p></body></html>"
        );
    }

    #[test]
    fn dynamic_pseudo_classes_go_to_the_residual_stylesheet() {
        init_logging();
        let mut inliner = CssInliner::from_html("<a href=\"#\">x</a>");
        inliner
            .inline_css(
                "a { color: blue } a:hover, a:focus { color: red } p::first-line { color: pink }",
            )
            .unwrap();
        assert_eq!(
            inliner.render().unwrap(),
            "<html><head><style type=\"text/css\">a:hover,a:focus{color: red}</style></head>\
             <body><a href=\"#\" style=\"color: blue;\">x</a></body></html>"
        );
        assert_eq!(
            inliner.matching_uninlinable_selectors().unwrap(),
            vec!["a:hover".to_string(), "a:focus".to_string()]
        );
    }

    #[test]
    fn negated_of_type_is_inlined_on_the_enclosing_type() {
        let html = "<p>a</p><p>b</p>";
        let mut inliner = CssInliner::from_html(html);
        inliner.inline_css("p:not(:first-of-type) { color: red }").unwrap();
        assert_eq!(
            inliner.render_body_content().unwrap(),
            r#"<p>a</p><p style="color: red;">b</p>"#
        );
        assert_eq!(inliner.matching_uninlinable_selectors().unwrap(), Vec::<String>::new());
        assert!(!inliner.render().unwrap().contains("<style"));
    }

    #[test]
    fn extreme_nth_offsets_match_without_overflow() {
        assert_eq!(
            inline_body(
                "<ul><li>a</li><li>b</li></ul>",
                "li:nth-child(n-2147483648) { color: red; } \
                 li:nth-child(-n-2147483648) { margin: 0 }"
            ),
            r#"<ul><li style="color: red;">a</li><li style="color: red;">b</li></ul>"#
        );
    }

    #[test]
    fn font_faces_need_a_family_and_a_source() {
        let output = inline_document(
            "<p></p>",
            "@font-face { font-family: Good; src: url(good.woff); }\n\
             @font-face { font-family: Bad; }\n\
             p { font-family: Good; }",
        );
        assert!(output.contains(
            "<style type=\"text/css\">\
             @font-face { font-family: Good; src: url(good.woff); }\n</style>"
        ));
        assert!(!output.contains("Bad"));
        assert!(output.contains("<p style=\"font-family: Good;\"></p>"));
    }

    #[test]
    fn comments_are_ignored() {
        assert_eq!(
            inline_body("<p></p>", "/* p { color: red } */ p { /* inner */ margin: 0 }"),
            "<p style=\"margin: 0;\"></p>"
        );
    }

    #[test]
    fn results_are_unavailable_before_inlining() {
        let inliner = CssInliner::from_html("<p></p>");
        assert!(matches!(
            inliner.matching_uninlinable_selectors(),
            Err(InlinerError::IllegalState(_))
        ));
    }

    #[test]
    fn strict_mode_fails_on_unsupported_exclusions() {
        init_logging();
        let mut permissive = CssInliner::from_html("<p></p>");
        permissive.add_excluded_selector("p[").inline_css("p { margin: 0 }").unwrap();
        assert_eq!(
            permissive.render_body_content().unwrap(),
            "<p style=\"margin: 0;\"></p>"
        );

        let mut strict = CssInliner::from_html("<p></p>");
        let outcome = strict
            .set_debug(true)
            .add_excluded_selector("p[")
            .inline_css("p { margin: 0 }");
        assert!(matches!(outcome, Err(InlinerError::SelectorSyntax { .. })));
    }

    #[test]
    fn unsupported_existence_checks_keep_the_rule_unless_strict() {
        init_logging();
        let css = "a:hover[ { color: red }";
        let mut permissive = CssInliner::from_html("<p></p>");
        permissive.inline_css(css).unwrap();
        assert_eq!(
            permissive.matching_uninlinable_selectors().unwrap(),
            vec!["a:hover[".to_string()]
        );

        let mut strict = CssInliner::from_html("<p></p>");
        assert!(strict.set_debug(true).inline_css(css).is_err());
    }
}
