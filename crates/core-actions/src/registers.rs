//! Which registers a yank, delete or put uses.
//!
//! * Yank without a name: `0` and the unnamed register.
//! * Delete without a name: `1` (shifting the history) when the text spans
//!   lines or the motion asks for it, else `-`. Named deletes also shift the
//!   history when the text spans lines.
//! * `_` swallows everything. `""` behaves like no name.

use core_state::{RegisterContent, RegisterStore, is_valid_register};
use tracing::debug;

use crate::error::CommandError;

pub(crate) fn normalize(regname: Option<char>) -> Option<char> {
    regname.filter(|&r| r != '"')
}

fn unnamed_after(regs: &dyn RegisterStore, name: char, fallback: RegisterContent) -> RegisterContent {
    regs.get_register(name.to_ascii_lowercase()).unwrap_or(fallback)
}

pub(crate) fn store_yank(
    regs: &mut dyn RegisterStore,
    regname: Option<char>,
    content: RegisterContent,
) -> Result<(), CommandError> {
    match normalize(regname) {
        Some('_') => {}
        Some(r) => {
            if !is_valid_register(r, true) {
                return Err(CommandError::InvalidRegister(r));
            }
            regs.set_register(r, content.clone())?;
            let unnamed = unnamed_after(regs, r, content);
            regs.set_register('"', unnamed)?;
        }
        None => {
            regs.set_register('0', content.clone())?;
            regs.set_register('"', content)?;
        }
    }
    debug!(target: "engine.operator", register = ?regname, "yank_stored");
    Ok(())
}

/// `numbered`: the deleted text spans lines, is linewise, or came from a
/// motion that always uses register 1.
pub(crate) fn store_delete(
    regs: &mut dyn RegisterStore,
    regname: Option<char>,
    content: RegisterContent,
    numbered: bool,
) -> Result<(), CommandError> {
    let name = normalize(regname);
    if name == Some('_') {
        return Ok(());
    }
    if let Some(r) = name {
        if !is_valid_register(r, true) {
            return Err(CommandError::InvalidRegister(r));
        }
        regs.set_register(r, content.clone())?;
    }
    if numbered {
        regs.rotate_numbered(content.clone())?;
    } else if name.is_none() {
        regs.set_register('-', content.clone())?;
    }
    let unnamed = match name {
        Some(r) if !numbered => unnamed_after(regs, r, content),
        _ => content,
    };
    regs.set_register('"', unnamed)?;
    debug!(target: "engine.operator", register = ?regname, numbered, "delete_stored");
    Ok(())
}

/// Contents to put; empty or unset registers are an error.
pub(crate) fn read_register(regs: &dyn RegisterStore, regname: Option<char>) -> Result<RegisterContent, CommandError> {
    let name = normalize(regname).unwrap_or('"');
    if !is_valid_register(name, false) {
        return Err(CommandError::InvalidRegister(name));
    }
    regs.get_register(name.to_ascii_lowercase())
        .filter(|c| !c.is_empty())
        .ok_or(CommandError::EmptyRegister(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::Registers;
    use pretty_assertions::assert_eq;

    #[test]
    fn small_delete_goes_to_minus() {
        let mut r = Registers::new();
        store_delete(&mut r, None, RegisterContent::charwise("ab"), false).unwrap();
        assert_eq!(r.get_register('-'), Some(RegisterContent::charwise("ab")));
        assert_eq!(r.get_register('1'), None);
        assert_eq!(r.get_register('"'), Some(RegisterContent::charwise("ab")));
    }

    #[test]
    fn line_delete_shifts_history() {
        let mut r = Registers::new();
        store_delete(&mut r, None, RegisterContent::linewise(["one"]), true).unwrap();
        store_delete(&mut r, None, RegisterContent::linewise(["two"]), true).unwrap();
        assert_eq!(r.get_register('1'), Some(RegisterContent::linewise(["two"])));
        assert_eq!(r.get_register('2'), Some(RegisterContent::linewise(["one"])));
    }

    #[test]
    fn named_append_updates_unnamed() {
        let mut r = Registers::new();
        store_yank(&mut r, Some('a'), RegisterContent::charwise("x")).unwrap();
        store_yank(&mut r, Some('A'), RegisterContent::charwise("y")).unwrap();
        assert_eq!(r.get_register('"'), Some(RegisterContent::charwise("xy")));
        assert_eq!(r.get_register('0'), None);
    }

    #[test]
    fn black_hole_and_empty_reads() {
        let mut r = Registers::new();
        store_delete(&mut r, Some('_'), RegisterContent::charwise("gone"), true).unwrap();
        assert_eq!(r.get_register('"'), None);
        assert_eq!(read_register(&r, Some('q')), Err(CommandError::EmptyRegister('q')));
        assert_eq!(read_register(&r, Some('!')), Err(CommandError::InvalidRegister('!')));
    }
}
