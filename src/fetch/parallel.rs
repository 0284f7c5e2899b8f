//! Splitting work into groups of roughly equal size.

/// Distribute `items` over at most `group_count` groups so that the summed
/// `size` of each group is roughly equal.
///
/// Largest items are placed first, each into the group that is currently
/// smallest. Empty groups are left out.
pub fn make_equal_groups<T, F>(mut items: Vec<T>, group_count: usize, size: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> u64,
{
    let group_count = group_count.max(1);
    items.sort_by_key(|item| std::cmp::Reverse(size(item)));

    let mut groups: Vec<(u64, Vec<T>)> = (0..group_count).map(|_| (0, Vec::new())).collect();
    for item in items {
        let item_size = size(&item);
        if let Some((total, group)) = groups.iter_mut().min_by_key(|(total, _)| *total) {
            *total += item_size;
            group.push(item);
        }
    }
    groups
        .into_iter()
        .map(|(_, group)| group)
        .filter(|group| !group.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_balanced() {
        let groups = make_equal_groups(vec![5u64, 1, 9, 3, 4, 2], 2, |&n| n);
        let sums: Vec<u64> = groups.iter().map(|g| g.iter().sum()).collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(sums.iter().sum::<u64>(), 24);
        assert_eq!(sums, vec![12, 12]);
    }

    #[test]
    fn test_fewer_items_than_groups() {
        let groups = make_equal_groups(vec![7u64], 4, |&n| n);
        assert_eq!(groups, vec![vec![7]]);
        assert!(make_equal_groups(Vec::<u64>::new(), 4, |&n| n).is_empty());
    }

    #[test]
    fn test_zero_groups_means_one() {
        let groups = make_equal_groups(vec![1u64, 2, 3], 0, |&n| n);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }
}
