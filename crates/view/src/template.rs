//! Path templating for view materialization.
//!
//! Renders a view's naming template — a string with single-brace `{token}`
//! placeholders — against the metadata of a [`File`] or [`Course`]. The
//! template is compiled eagerly via [`FromStr`] so that syntax errors and
//! unknown tokens surface when the view is opened, before any filesystem
//! mutation. `{{` and `}}` render literal braces.
//!
//! # Template tokens
//!
//! | Token                     | Value                                                  |
//! |---------------------------|--------------------------------------------------------|
//! | `semester`                | Semester label as the server spells it                 |
//! | `semester-lexical`        | Sortable form, `"WS 2016/17"` → `"2016 WS"`            |
//! | `semester-lexical-short`  | Compact sortable form, `"2016WS"`                      |
//! | `course-id`               | Course identifier (never escaped)                      |
//! | `course-abbrev`           | Course abbreviation                                    |
//! | `course`                  | Course name                                            |
//! | `type` / `type-abbrev`    | Course type, long and short                            |
//! | `path`                    | Server-side folder sequence, separator-joined          |
//! | `short-path`              | Same, with the general-folder sentinel stripped        |
//! | `id`                      | File identifier (never escaped)                        |
//! | `name`                    | Bare file name                                         |
//! | `ext`                     | Extension with leading dot and version suffix (below)  |
//! | `description`             | Server-side description                                |
//! | `descr-no-ext`            | Description with a trailing `.<ext>` stripped          |
//! | `author`                  | Author display name                                    |
//! | `time`                    | Upload timestamp, `YYYY-MM-DD HH:MM:SS`                |
//!
//! All textual values pass through [`escape_file_name`] with the view's
//! charset and escape mode; identifier tokens do not.
//!
//! The `ext` token owns its dot placement: it renders empty for files
//! without an extension and carries the escaped-as-a-unit version suffix
//! for re-uploads (`" (Version 2)"` for version 1). A literal `.`
//! immediately preceding `{ext}` is absorbed into the token, so the
//! conventional `"{name}.{ext}"` renders `slides.pdf`, `slides (Version
//! 2).pdf` and plain `slides` without double or dangling dots.

use crate::error::{Error, ErrorKind, Result};
use crate::escape::escape_file_name;
use exn::ResultExt;
use lectern_metadata::{Course, File, View};
use lectern_store::validate_path;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use time::macros::format_description;

/// A named placeholder recognized by the template compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Semester,
    SemesterLexical,
    SemesterLexicalShort,
    CourseId,
    CourseAbbrev,
    Course,
    Type,
    TypeAbbrev,
    Path,
    ShortPath,
    Id,
    Name,
    Ext,
    Description,
    DescrNoExt,
    Author,
    Time,
}

impl Token {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "semester" => Self::Semester,
            "semester-lexical" => Self::SemesterLexical,
            "semester-lexical-short" => Self::SemesterLexicalShort,
            "course-id" => Self::CourseId,
            "course-abbrev" => Self::CourseAbbrev,
            "course" => Self::Course,
            "type" => Self::Type,
            "type-abbrev" => Self::TypeAbbrev,
            "path" => Self::Path,
            "short-path" => Self::ShortPath,
            "id" => Self::Id,
            "name" => Self::Name,
            "ext" => Self::Ext,
            "description" => Self::Description,
            "descr-no-ext" => Self::DescrNoExt,
            "author" => Self::Author,
            "time" => Self::Time,
            _ => return None,
        })
    }
}

enum Segment {
    Literal(String),
    Token(Token),
}

/// A compiled naming template.
///
/// Constructed via [`FromStr`], which parses the placeholder syntax and
/// resolves every token name eagerly — a malformed format string is a
/// configuration error and must never half-materialize a view. The
/// compiled template is reusable across files and courses; rendering is
/// deterministic and pure.
///
/// # Examples
///
/// ```
/// use lectern_view::PathTemplate;
///
/// let template: PathTemplate = "{course}/{name}.{ext}".parse()?;
/// assert!("{unknown-token}".parse::<PathTemplate>().is_err());
/// assert!("{unterminated".parse::<PathTemplate>().is_err());
/// # Ok::<(), lectern_view::error::Error>(())
/// ```
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                },
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                },
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => exn::bail!(ErrorKind::Template(format!("unterminated placeholder `{{{name}`"))),
                        }
                    }
                    let token = Token::parse(&name)
                        .ok_or_else(|| Error::from(ErrorKind::Template(format!("unknown token `{name}`"))))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token(token));
                },
                '}' => exn::bail!(ErrorKind::Template("stray `}` outside placeholder".to_string())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            exn::bail!(ErrorKind::Template("empty format string".to_string()));
        }
        Ok(Self { segments })
    }
}

impl PathTemplate {
    /// Renders the template against a token set, producing a normalized,
    /// root-relative path.
    ///
    /// The result is validated to stay within the view root; a template
    /// whose literals smuggle in `..` or an absolute prefix is rejected
    /// here as a [`Template`](ErrorKind::Template) error.
    pub fn render(&self, tokens: &Tokens) -> Result<PathBuf> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(token) => {
                    // The ext token carries its own dot; absorb one written
                    // into the template right before it.
                    if *token == Token::Ext && out.ends_with('.') {
                        out.pop();
                    }
                    out.push_str(tokens.get(*token));
                },
            }
        }
        validate_path(&out).or_raise(|| ErrorKind::Template(format!("renders to invalid path `{out}`")))
    }
}

/// Escaped token values derived from one [`File`] or [`Course`].
pub struct Tokens {
    values: HashMap<Token, String>,
}

impl Tokens {
    /// Token values for a file, escaped per the view's naming policy.
    ///
    /// `general_folder` is the server-specific name of the default folder
    /// that `short-path` strips when it is the first path segment.
    pub fn for_file(file: &File, view: &View, general_folder: &str) -> Self {
        let esc = |s: &str| escape_file_name(s, view.charset, view.escape);
        let esc_path = |folders: &[String]| folders.iter().map(|f| esc(f)).collect::<Vec<_>>().join("/");

        let descr_no_ext = match file.extension.is_empty() {
            false => file
                .description
                .strip_suffix(&format!(".{}", file.extension))
                .unwrap_or(&file.description),
            true => file.description.as_str(),
        };
        let short_path = match file.path.first() {
            Some(first) if first == general_folder => &file.path[1..],
            _ => &file.path[..],
        };
        let mut ext = match file.extension.is_empty() {
            false => format!(".{}", file.extension),
            true => String::new(),
        };
        if file.version > 0 {
            // The suffix is escaped as a unit so the parentheses and space
            // survive whatever the escape mode does to the extension text.
            ext = format!("{}{ext}", esc(&format!(" (Version {})", file.version + 1)));
        }
        let time = file
            .local_date
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            .unwrap_or_else(|_| file.local_date.to_string());

        let values = HashMap::from([
            (Token::Semester, esc(&file.course.semester)),
            (Token::SemesterLexical, esc(&lexicalise_semester(&file.course.semester, false))),
            (Token::SemesterLexicalShort, esc(&lexicalise_semester(&file.course.semester, true))),
            (Token::CourseId, file.course.id.clone()),
            (Token::CourseAbbrev, esc(&file.course.abbrev)),
            (Token::Course, esc(&file.course.name)),
            (Token::Type, esc(&file.course.course_type)),
            (Token::TypeAbbrev, esc(&file.course.type_abbrev)),
            (Token::Path, esc_path(&file.path)),
            (Token::ShortPath, esc_path(short_path)),
            (Token::Id, file.id.clone()),
            (Token::Name, esc(&file.name)),
            (Token::Ext, ext),
            (Token::Description, esc(&file.description)),
            (Token::DescrNoExt, esc(descr_no_ext)),
            (Token::Author, esc(&file.author)),
            (Token::Time, esc(&time)),
        ]);
        Self { values }
    }

    /// Token values for a course without files, sufficient to resolve the
    /// directory prefix of its templated path. File-only tokens hold inert
    /// placeholders; the caller takes the parent of the rendered path.
    pub fn for_course(course: &Course, view: &View) -> Self {
        let esc = |s: &str| escape_file_name(s, view.charset, view.escape);
        let values = HashMap::from([
            (Token::Semester, esc(&course.semester)),
            (Token::SemesterLexical, esc(&lexicalise_semester(&course.semester, false))),
            (Token::SemesterLexicalShort, esc(&lexicalise_semester(&course.semester, true))),
            (Token::CourseId, course.id.clone()),
            (Token::CourseAbbrev, esc(&course.abbrev)),
            (Token::Course, esc(&course.name)),
            (Token::Type, esc(&course.course_type)),
            (Token::TypeAbbrev, esc(&course.type_abbrev)),
            (Token::Path, String::new()),
            (Token::ShortPath, String::new()),
            (Token::Id, "0".repeat(32)),
            (Token::Name, "placeholder".to_string()),
            (Token::Ext, String::new()),
            (Token::Description, "placeholder".to_string()),
            (Token::DescrNoExt, "placeholder".to_string()),
            (Token::Author, "nobody".to_string()),
            (Token::Time, "0000-00-00 00-00-00".to_string()),
        ]);
        Self { values }
    }

    fn get(&self, token: Token) -> &str {
        // Every Token variant is inserted by both constructors; a miss is
        // unreachable by construction.
        self.values.get(&token).map(String::as_str).unwrap_or_default()
    }
}

/// Rewrites a semester label into a lexically sortable form.
///
/// `"WS 2016/17"` becomes `"2016 WS"` (or `"2016WS"` in short form), so an
/// alphabetical directory listing orders semesters chronologically — summer
/// before winter within a year, since `SS` < `WS`. Labels that do not match
/// the `<season> <year>` shape pass through unchanged.
fn lexicalise_semester(semester: &str, short: bool) -> String {
    let mut parts = semester.split_whitespace();
    if let (Some(season), Some(years), None) = (parts.next(), parts.next(), parts.next()) {
        let year = years.split('/').next().unwrap_or(years);
        if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
            return match short {
                true => format!("{year}{season}"),
                false => format!("{year} {season}"),
            };
        }
    }
    semester.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_metadata::{Charset, CourseRef, EscapeMode};
    use rstest::rstest;
    use std::path::Path;
    use time::macros::datetime;

    fn make_view(format: &str) -> View {
        View {
            id: 0,
            name: "test view".to_string(),
            format: format.to_string(),
            escape: EscapeMode::Similar,
            charset: Charset::Unicode,
            base: None,
        }
    }

    fn make_file(name: &str, extension: &str, version: u32) -> File {
        File {
            id: "cafebabe".to_string(),
            version,
            name: name.to_string(),
            extension: extension.to_string(),
            description: format!("{name}.{extension}"),
            path: vec!["Handouts".to_string(), "Week 1".to_string()],
            course: CourseRef {
                id: "c0ffee".to_string(),
                name: "Algorithms".to_string(),
                abbrev: "Algo".to_string(),
                course_type: "Lecture".to_string(),
                type_abbrev: "L".to_string(),
                semester: "WS 2016/17".to_string(),
            },
            author: "Grace Hopper".to_string(),
            local_date: datetime!(2016-10-24 14:30:00 UTC),
            copyrighted: false,
        }
    }

    fn render(format: &str, file: &File) -> PathBuf {
        let view = make_view(format);
        let template: PathTemplate = format.parse().unwrap();
        template.render(&Tokens::for_file(file, &view, "General Files")).unwrap()
    }

    #[test]
    fn test_basic_scenario() {
        let file = make_file("slides", "pdf", 0);
        assert_eq!(render("{course}/{name}.{ext}", &file), Path::new("Algorithms/slides.pdf"));
    }

    #[test]
    fn test_version_suffix() {
        let file = make_file("slides", "pdf", 1);
        assert_eq!(render("{course}/{name}.{ext}", &file), Path::new("Algorithms/slides (Version 2).pdf"));
    }

    #[test]
    fn test_versioned_links_coexist() {
        let v0 = render("{name}.{ext}", &make_file("slides", "pdf", 0));
        let v1 = render("{name}.{ext}", &make_file("slides", "pdf", 1));
        assert_ne!(v0, v1);
    }

    #[test]
    fn test_empty_extension_leaves_no_dangling_dot() {
        let file = make_file("README", "", 0);
        assert_eq!(render("{name}.{ext}", &file), Path::new("README"));
    }

    #[rstest]
    #[case("{path}/{name}.{ext}", "Handouts/Week 1/slides.pdf")]
    #[case("{semester-lexical}/{course-abbrev}/{name}.{ext}", "2016 WS/Algo/slides.pdf")]
    #[case("{semester-lexical-short} {course}/{descr-no-ext}.{ext}", "2016WS Algorithms/slides.pdf")]
    #[case("{type-abbrev}/{author}/{id}.{ext}", "L/Grace Hopper/cafebabe.pdf")]
    #[case("{course-id}/{description}", "c0ffee/slides.pdf")]
    fn test_token_rendering(#[case] format: &str, #[case] expected: &str) {
        assert_eq!(render(format, &make_file("slides", "pdf", 0)), Path::new(expected));
    }

    #[test]
    fn test_time_token_is_escaped() {
        let rendered = render("{time} {name}.{ext}", &make_file("slides", "pdf", 0));
        // Colons in the timestamp become ratio signs under Similar/Unicode.
        assert_eq!(rendered, Path::new("2016-10-24 14\u{2236}30\u{2236}00 slides.pdf"));
    }

    #[test]
    fn test_short_path_strips_general_folder() {
        let mut file = make_file("slides", "pdf", 0);
        file.path = vec!["General Files".to_string(), "Week 1".to_string()];
        assert_eq!(render("{short-path}/{name}.{ext}", &file), Path::new("Week 1/slides.pdf"));
        // Only as the first segment.
        file.path = vec!["Week 1".to_string(), "General Files".to_string()];
        assert_eq!(render("{short-path}/{name}.{ext}", &file), Path::new("Week 1/General Files/slides.pdf"));
    }

    #[test]
    fn test_empty_path_token_collapses() {
        let mut file = make_file("slides", "pdf", 0);
        file.path = vec![];
        assert_eq!(render("{course}/{path}/{name}.{ext}", &file), Path::new("Algorithms/slides.pdf"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let file = make_file("slides", "pdf", 0);
        assert_eq!(render("{course}/{name}.{ext}", &file), render("{course}/{name}.{ext}", &file));
    }

    #[test]
    fn test_literal_braces() {
        let file = make_file("slides", "pdf", 0);
        assert_eq!(render("{{{name}}}.{ext}", &file), Path::new("{slides}.pdf"));
    }

    #[rstest]
    #[case("{unknown-token}")]
    #[case("{name")]
    #[case("name}")]
    #[case("")]
    fn test_compile_errors(#[case] format: &str) {
        assert!(format.parse::<PathTemplate>().is_err());
    }

    #[test]
    fn test_traversal_in_literal_is_rejected() {
        let file = make_file("slides", "pdf", 0);
        let template: PathTemplate = "../{name}.{ext}".parse().unwrap();
        let view = make_view("../{name}.{ext}");
        assert!(template.render(&Tokens::for_file(&file, &view, "General Files")).is_err());
    }

    #[test]
    fn test_course_tokens_resolve_directory_prefix() {
        let course = Course {
            id: "c0ffee".to_string(),
            name: "Algorithms".to_string(),
            abbrev: "Algo".to_string(),
            course_type: "Lecture".to_string(),
            type_abbrev: "L".to_string(),
            semester: "WS 2016/17".to_string(),
            sync: lectern_metadata::SyncPolicy::Full,
        };
        let view = make_view("{course} ({type})/{path}/{name}.{ext}");
        let template: PathTemplate = view.format.parse().unwrap();
        let rendered = template.render(&Tokens::for_course(&course, &view)).unwrap();
        assert_eq!(rendered.parent(), Some(Path::new("Algorithms (Lecture)")));
    }

    #[rstest]
    #[case("WS 2016/17", "2016 WS", "2016WS")]
    #[case("SS 2016", "2016 SS", "2016SS")]
    #[case("Sommersemester", "Sommersemester", "Sommersemester")]
    #[case("WS 16/17", "WS 16/17", "WS 16/17")]
    fn test_lexicalise_semester(#[case] input: &str, #[case] long: &str, #[case] short: &str) {
        assert_eq!(lexicalise_semester(input, false), long);
        assert_eq!(lexicalise_semester(input, true), short);
    }
}
