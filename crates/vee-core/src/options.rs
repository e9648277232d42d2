//! Editor options — the `:set` system.
//!
//! Syntax accepted, per Vim:
//!
//! | Form             | Effect                          |
//! |------------------|---------------------------------|
//! | `:set option`    | enable boolean / query numeric  |
//! | `:set nooption`  | disable boolean                 |
//! | `:set option!`   | toggle boolean                  |
//! | `:set option?`   | query current value             |
//! | `:set option=N`  | assign numeric value            |
//!
//! Options and abbreviations:
//!
//! | Name         | Abbrev | Type | Default |
//! |--------------|--------|------|---------|
//! | `number`     | `nu`   | bool | off     |
//! | `ignorecase` | `ic`   | bool | off     |
//! | `wrapscan`   | `ws`   | bool | on      |
//! | `expandtab`  | `et`   | bool | off     |
//! | `tabstop`    | `ts`   | num  | 8       |
//! | `shiftwidth` | `sw`   | num  | 8       |
//!
//! `ignorecase` feeds pattern compilation and `wrapscan` gates search
//! wraparound; the rest are carried state a front-end can render from.

/// Current option values for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub number: bool,
    pub ignore_case: bool,
    pub wrap_scan: bool,
    pub expand_tab: bool,
    pub tab_stop: usize,
    pub shift_width: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            number: false,
            ignore_case: false,
            wrap_scan: true,
            expand_tab: false,
            tab_stop: 8,
            shift_width: 8,
        }
    }
}

/// One parsed `:set` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    On(String),
    Off(String),
    Toggle(String),
    Query(String),
    Assign(String, String),
}

/// Split a `:set` argument string into directives. Multiple
/// space-separated arguments are allowed (`:set nu ts=4`).
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    args.split_whitespace().map(parse_one).collect()
}

fn parse_one(arg: &str) -> SetDirective {
    if let Some(eq) = arg.find('=') {
        return SetDirective::Assign(arg[..eq].to_string(), arg[eq + 1..].to_string());
    }
    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }
    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }
    // `no<option>` only when the remainder is a known boolean — `:set number`
    // must not parse as `no` + `mber`.
    if let Some(name) = arg.strip_prefix("no") {
        if lookup(name).is_some_and(|o| o.is_bool()) {
            return SetDirective::Off(name.to_string());
        }
    }
    // A bare numeric option name queries its value, Vim-style.
    if lookup(arg).is_some_and(|o| !o.is_bool()) {
        return SetDirective::Query(arg.to_string());
    }
    SetDirective::On(arg.to_string())
}

// ---------------------------------------------------------------------------
// Option table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opt {
    Number,
    IgnoreCase,
    WrapScan,
    ExpandTab,
    TabStop,
    ShiftWidth,
}

impl Opt {
    const fn is_bool(self) -> bool {
        !matches!(self, Self::TabStop | Self::ShiftWidth)
    }

    const fn canonical(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::IgnoreCase => "ignorecase",
            Self::WrapScan => "wrapscan",
            Self::ExpandTab => "expandtab",
            Self::TabStop => "tabstop",
            Self::ShiftWidth => "shiftwidth",
        }
    }
}

fn lookup(name: &str) -> Option<Opt> {
    match name {
        "number" | "nu" => Some(Opt::Number),
        "ignorecase" | "ic" => Some(Opt::IgnoreCase),
        "wrapscan" | "ws" => Some(Opt::WrapScan),
        "expandtab" | "et" => Some(Opt::ExpandTab),
        "tabstop" | "ts" => Some(Opt::TabStop),
        "shiftwidth" | "sw" => Some(Opt::ShiftWidth),
        _ => None,
    }
}

impl Options {
    /// Apply one directive. `Ok(Some(text))` carries a query answer for the
    /// status line; `Err` carries the failure message.
    ///
    /// # Errors
    ///
    /// Unknown option names and non-numeric assignments to numeric options.
    pub fn apply(&mut self, directive: &SetDirective) -> Result<Option<String>, String> {
        match directive {
            SetDirective::On(name) => self.set_bool(name, |_| true).map(|()| None),
            SetDirective::Off(name) => self.set_bool(name, |_| false).map(|()| None),
            SetDirective::Toggle(name) => self.set_bool(name, |v| !v).map(|()| None),
            SetDirective::Query(name) => {
                let opt = lookup(name).ok_or_else(|| unknown(name))?;
                Ok(Some(self.describe(opt)))
            }
            SetDirective::Assign(name, value) => {
                let opt = lookup(name).ok_or_else(|| unknown(name))?;
                if opt.is_bool() {
                    return Err(format!(
                        "invalid argument: {}={value}",
                        opt.canonical()
                    ));
                }
                let n: usize = value
                    .parse()
                    .map_err(|_| format!("number required: {}={value}", opt.canonical()))?;
                match opt {
                    Opt::TabStop => self.tab_stop = n,
                    Opt::ShiftWidth => self.shift_width = n,
                    _ => unreachable!(),
                }
                Ok(None)
            }
        }
    }

    fn set_bool(&mut self, name: &str, f: impl Fn(bool) -> bool) -> Result<(), String> {
        let opt = lookup(name).ok_or_else(|| unknown(name))?;
        match opt {
            Opt::Number => self.number = f(self.number),
            Opt::IgnoreCase => self.ignore_case = f(self.ignore_case),
            Opt::WrapScan => self.wrap_scan = f(self.wrap_scan),
            Opt::ExpandTab => self.expand_tab = f(self.expand_tab),
            Opt::TabStop | Opt::ShiftWidth => {
                return Err(format!("invalid argument: {name}"));
            }
        }
        Ok(())
    }

    fn describe(&self, opt: Opt) -> String {
        let name = opt.canonical();
        match opt {
            Opt::Number => flag(name, self.number),
            Opt::IgnoreCase => flag(name, self.ignore_case),
            Opt::WrapScan => flag(name, self.wrap_scan),
            Opt::ExpandTab => flag(name, self.expand_tab),
            Opt::TabStop => format!("{name}={}", self.tab_stop),
            Opt::ShiftWidth => format!("{name}={}", self.shift_width),
        }
    }
}

fn flag(name: &str, value: bool) -> String {
    if value {
        name.to_string()
    } else {
        format!("no{name}")
    }
}

fn unknown(name: &str) -> String {
    format!("unknown option: {name}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert!(!opts.number);
        assert!(!opts.ignore_case);
        assert!(opts.wrap_scan);
        assert_eq!(opts.tab_stop, 8);
    }

    #[test]
    fn parse_forms() {
        assert_eq!(parse_set("number"), vec![SetDirective::On("number".into())]);
        assert_eq!(parse_set("nonu"), vec![SetDirective::Off("nu".into())]);
        assert_eq!(parse_set("ic!"), vec![SetDirective::Toggle("ic".into())]);
        assert_eq!(parse_set("ws?"), vec![SetDirective::Query("ws".into())]);
        assert_eq!(
            parse_set("ts=4"),
            vec![SetDirective::Assign("ts".into(), "4".into())]
        );
    }

    #[test]
    fn parse_number_is_not_no_mber() {
        assert_eq!(parse_set("number"), vec![SetDirective::On("number".into())]);
    }

    #[test]
    fn bare_numeric_name_queries() {
        assert_eq!(parse_set("tabstop"), vec![SetDirective::Query("tabstop".into())]);
    }

    #[test]
    fn parse_multiple_args() {
        let parsed = parse_set("nu ts=2 nowrapscan");
        assert_eq!(
            parsed,
            vec![
                SetDirective::On("nu".into()),
                SetDirective::Assign("ts".into(), "2".into()),
                SetDirective::Off("wrapscan".into()),
            ]
        );
    }

    #[test]
    fn apply_bool_cycle() {
        let mut opts = Options::default();
        opts.apply(&SetDirective::On("ic".into())).unwrap();
        assert!(opts.ignore_case);
        opts.apply(&SetDirective::Toggle("ic".into())).unwrap();
        assert!(!opts.ignore_case);
        opts.apply(&SetDirective::On("ignorecase".into())).unwrap();
        opts.apply(&SetDirective::Off("ignorecase".into())).unwrap();
        assert!(!opts.ignore_case);
    }

    #[test]
    fn apply_assign_numeric() {
        let mut opts = Options::default();
        opts.apply(&SetDirective::Assign("ts".into(), "2".into())).unwrap();
        assert_eq!(opts.tab_stop, 2);
        opts.apply(&SetDirective::Assign("shiftwidth".into(), "3".into())).unwrap();
        assert_eq!(opts.shift_width, 3);
    }

    #[test]
    fn query_formats() {
        let mut opts = Options::default();
        assert_eq!(
            opts.apply(&SetDirective::Query("ws".into())).unwrap(),
            Some("wrapscan".into())
        );
        opts.wrap_scan = false;
        assert_eq!(
            opts.apply(&SetDirective::Query("ws".into())).unwrap(),
            Some("nowrapscan".into())
        );
        assert_eq!(
            opts.apply(&SetDirective::Query("ts".into())).unwrap(),
            Some("tabstop=8".into())
        );
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut opts = Options::default();
        assert!(opts.apply(&SetDirective::On("bogus".into())).is_err());
        assert!(opts.apply(&SetDirective::Query("bogus".into())).is_err());
    }

    #[test]
    fn numeric_misuse_is_an_error() {
        let mut opts = Options::default();
        assert!(opts.apply(&SetDirective::On("ts".into())).is_err());
        assert!(opts
            .apply(&SetDirective::Assign("ts".into(), "abc".into()))
            .is_err());
        assert!(opts
            .apply(&SetDirective::Assign("nu".into(), "1".into()))
            .is_err());
    }
}
