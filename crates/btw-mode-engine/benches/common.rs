// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_article(senses: usize, examples_per_sense: usize) -> String {
    let mut content = String::from("<btw:entry><btw:lemma>prajñā</btw:lemma><btw:sense-discrimination>");
    let mut example = 0;

    for sense in 0..senses {
        content.push_str(&format!(
            "<btw:sense xml:id=\"S.{sense}\"><btw:english-renditions><btw:english-rendition>\
             <btw:term>wisdom</btw:term></btw:english-rendition></btw:english-renditions>\
             <btw:explanation>sense {sense}</btw:explanation><btw:citations>"
        ));
        for _ in 0..examples_per_sense {
            content.push_str(&format!(
                "<btw:example xml:id=\"E.{example}\"><btw:cit><ref target=\"/bibl/{example}\">\
                 ref</ref></btw:cit></btw:example>"
            ));
            example += 1;
        }
        content.push_str("</btw:citations>");
        if sense > 0 {
            content.push_str(&format!(
                "<btw:contrastive-section><btw:antonyms/><btw:cognates/>\
                 <btw:conceptual-proximates/></btw:contrastive-section>\
                 <btw:other-citations><ptr target=\"#S.{}\"/></btw:other-citations>",
                sense - 1
            ));
        }
        content.push_str("</btw:sense>");
    }

    content.push_str("</btw:sense-discrimination></btw:entry>");
    content
}
