pub mod ids;

pub use ids::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_index_roundtrip() {
        let h = ModelHandle::from_index(7);
        assert_eq!(h.index(), 7);
        assert_eq!(h.as_usize(), 7);
    }

    #[test]
    fn next_for_len_follows_arena_length() {
        assert_eq!(TemplateHandle::next_for_len(0), Some(TemplateHandle::from_index(0)));
        assert_eq!(TemplateHandle::next_for_len(12), Some(TemplateHandle::from_index(12)));
        assert_eq!(TemplateHandle::next_for_len(u32::MAX as usize + 1), None);
    }

    #[test]
    fn display_carries_arena_label() {
        assert_eq!(SpawnId::from_index(3).to_string(), "spawn#3");
        assert_eq!(SurfaceHandle::from_index(1).to_string(), "surface#1");
        assert_eq!(format!("{:?}", ModelHandle::from_index(2)), "ModelHandle(2)");
        assert_eq!(<ModelHandle as ArenaHandle>::LABEL, "model");
    }

    #[test]
    fn handles_order_by_index() {
        let mut ids = vec![SpawnId::from_index(4), SpawnId::from_index(1), SpawnId::from_index(3)];
        ids.sort();
        assert_eq!(
            ids.iter().map(|id| id.index()).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
    }
}
