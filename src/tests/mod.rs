#[cfg(test)]
mod local_list_tests;

#[cfg(test)]
mod tests {
    use crate::dex::instructions::{DalvInsn, DalvInsnList, InsnKind};
    use crate::dex::opcodes;
    use crate::types::{RegisterSpec, RegisterSpecSet};
    use crate::DexErrorKind;

    #[test]
    fn assemble_assigns_addresses_by_format_size() {
        let move16 = opcodes::by_name("move/16").unwrap();
        let const_wide = opcodes::by_name("const-wide").unwrap();
        let insns = DalvInsnList::assemble(vec![
            InsnKind::plain(move16, &[1, 2]),
            InsnKind::plain(const_wide, &[4]),
            InsnKind::snapshot(RegisterSpecSet::new(6)),
        ])
        .unwrap();
        let addresses: Vec<u32> = insns.iter().map(DalvInsn::address).collect();
        assert_eq!(addresses, vec![0, 3, 8]);
        assert_eq!(insns.code_size(), 8);
        assert_eq!(insns.len(), 3);
    }

    #[test]
    fn instruction_display() {
        let move16 = opcodes::by_name("move/16").unwrap();
        let x = RegisterSpec::local(1, "I", "x").unwrap();
        let insns = DalvInsnList::assemble(vec![
            InsnKind::plain(move16, &[1, 2]),
            InsnKind::LocalStart(x),
            InsnKind::snapshot(RegisterSpecSet::new(2)),
        ])
        .unwrap();
        let lines: Vec<String> = insns.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec!["0000: move/16 v1, v2", "0003: local-start v1 x:I", "0003: local-snapshot"]
        );
    }

    #[test]
    fn explicit_addresses_are_checked() {
        let nop = opcodes::get(0x00).unwrap();
        let ok = DalvInsnList::with_addresses(
            vec![
                DalvInsn::new(0, InsnKind::plain(nop, &[])),
                DalvInsn::new(1, InsnKind::snapshot(RegisterSpecSet::new(1))),
                DalvInsn::new(1, InsnKind::plain(nop, &[])),
            ],
            2,
        )
        .unwrap();
        assert_eq!(ok.code_size(), 2);

        let backwards = DalvInsnList::with_addresses(
            vec![
                DalvInsn::new(1, InsnKind::plain(nop, &[])),
                DalvInsn::new(0, InsnKind::plain(nop, &[])),
            ],
            4,
        )
        .unwrap_err();
        assert_eq!(backwards.kind(), DexErrorKind::IllegalArgument);

        let overrun =
            DalvInsnList::with_addresses(vec![DalvInsn::new(3, InsnKind::plain(nop, &[]))], 3)
                .unwrap_err();
        assert_eq!(overrun.kind(), DexErrorKind::IllegalArgument);

        let wrapped =
            DalvInsnList::with_addresses(vec![DalvInsn::new(u32::MAX, InsnKind::plain(nop, &[]))], 10)
                .unwrap_err();
        assert_eq!(wrapped.kind(), DexErrorKind::IllegalArgument);
        assert!(wrapped.message().contains("overflows"));
    }

    #[test]
    fn next_address_reports_overflow() {
        let nop = opcodes::get(0x00).unwrap();
        let last = DalvInsn::new(u32::MAX, InsnKind::plain(nop, &[]));
        assert_eq!(last.next_address(), None);
        // Markers take no space, so they fit even at the top of the range.
        let marker = DalvInsn::new(u32::MAX, InsnKind::snapshot(RegisterSpecSet::new(1)));
        assert_eq!(marker.next_address(), Some(u32::MAX));
        assert_eq!(DalvInsn::new(4, InsnKind::plain(nop, &[])).next_address(), Some(5));
    }
}
