use phylo_splits::{
    Bitset, DistributionConfig, SplitDistribution, SplitError, TaxonUniverse, encode_splits,
    encode_trees, is_informative_split, render_split_reversed,
};
use phylotree::tree::Tree as PhyloTree;

fn universe(labels: &[&str]) -> TaxonUniverse {
    TaxonUniverse::from_labels(labels.iter().copied())
}

fn tree(newick: &str) -> PhyloTree {
    PhyloTree::from_newick(newick).unwrap()
}

/// Universe {A,B,C,D} at bits 0..3. The tree induces {A}, {B}, {A,B} and
/// the root edge over all taxa.
#[test]
fn four_taxon_scenario() {
    let taxa = universe(&["A", "B", "C", "D"]);
    let full = taxa.full_mask();
    assert_eq!(full, Bitset::from_word(0b1111));

    let enc = encode_splits(&tree("((A,B),C,D);"), Some(&taxa), Some(false)).unwrap();
    for word in [0b0001, 0b0010, 0b0011, 0b1111] {
        assert!(enc.split_edges().contains_key(&Bitset::from_word(word)));
    }

    assert!(is_informative_split(&Bitset::from_word(0b0011), &full));
    assert!(!is_informative_split(&Bitset::from_word(0b0001), &full));
}

#[test]
fn same_tree_twice_gives_full_support() {
    let mut dist = SplitDistribution::new(universe(&["A", "B", "C", "D"]));
    let t = tree("((A:0.1,B:0.2):0.3,C:0.4,D:0.5);");
    dist.count_splits_on_tree(&t).unwrap();
    dist.count_splits_on_tree(&t).unwrap();

    let ab = Bitset::from_word(0b0011);
    assert_eq!(dist.trees_counted(), 2);
    assert_eq!(dist.split_occurrence(&ab), 2);
    assert_eq!(dist.frequency_of(&ab), Some(1.0));
    assert_eq!(dist.edge_lengths(&ab).unwrap(), &[0.3, 0.3]);
}

#[test]
fn unknown_taxon_is_rejected_without_side_effects() {
    let mut dist = SplitDistribution::new(universe(&["A", "B", "C", "D"]));
    let err = dist.count_splits_on_tree(&tree("((A,B),C,Q);")).unwrap_err();

    assert!(matches!(err, SplitError::UnknownTaxon(ref name) if name == "Q"));
    assert_eq!(dist.trees_counted(), 0);
    assert_eq!(dist.splits_considered().total, 0);
}

/// Trees listing taxa in a different order than the shared universe are
/// remapped by name before aggregation.
#[test]
fn trees_are_remapped_to_the_shared_universe() {
    let mut dist = SplitDistribution::new(universe(&["D", "C", "B", "A"]));
    dist.count_splits_on_tree(&tree("((A,B),C,D);")).unwrap();
    dist.count_splits_on_tree(&tree("(D,C,(B,A));")).unwrap();

    // A=3, B=2 in this universe
    let ab = Bitset::from_indices([2, 3]);
    assert_eq!(dist.split_occurrence(&ab), 2);
    assert_eq!(dist.universe().taxa_in(&ab), vec!["B", "A"]);
}

/// Ten-taxon sample: every split frequency equals count / trees.
#[test]
fn frequencies_match_occurrence_over_trees() {
    let newicks = [
        "(A:0.1,(B:0.1,(H:0.1,(D:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,((J:0.1,H:0.1):0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
    ];
    let trees: Vec<PhyloTree> = newicks.iter().map(|s| tree(s)).collect();
    let taxa = TaxonUniverse::from_tree(&trees[0]);
    assert_eq!(taxa.len(), 10);

    let mut dist = SplitDistribution::new(taxa.clone());
    assert_eq!(dist.count_splits_on_trees(trees).unwrap(), 4);

    let n = dist.trees_counted() as f64;
    let freqs = dist.split_frequencies().clone();
    assert_eq!(freqs.len(), dist.unique_splits());
    for (split, freq) in &freqs {
        assert_eq!(dist.split_occurrence(split) as f64 / n, *freq);
        assert!((0.0..=1.0).contains(freq));
    }

    // {F,I} in every tree, {E,G} and {E,F,G,I} in the first three
    let eg = Bitset::from_indices([taxa.bit_for("E").unwrap(), taxa.bit_for("G").unwrap()]);
    let fi = Bitset::from_indices([taxa.bit_for("F").unwrap(), taxa.bit_for("I").unwrap()]);
    assert_eq!(dist.frequency_of(&eg), Some(0.75));
    assert_eq!(dist.frequency_of(&fi), Some(1.0));
    assert_eq!(dist.frequency_of(&(&eg | &fi)), Some(0.75));
}

/// Encoding may run elsewhere; the distribution only folds the results.
#[test]
fn pre_encoded_trees_fold_like_direct_counting() {
    let taxa = universe(&["A", "B", "C", "D", "E"]);
    let newicks = ["((A,B),(C,D),E);", "((A,B),C,(D,E));", "(A,(B,C),(D,E));"];

    let mut direct = SplitDistribution::new(taxa.clone());
    for s in newicks {
        direct.count_splits_on_tree(&tree(s)).unwrap();
    }

    let mut folded = SplitDistribution::with_config(taxa.clone(), DistributionConfig::default());
    let trees = newicks.iter().map(|s| tree(s)).collect();
    for encoding in encode_trees(trees, &taxa, Some(true)) {
        folded.count_encoding(&encoding.unwrap()).unwrap();
    }

    assert_eq!(folded.trees_counted(), 3);
    assert_eq!(folded.splits_considered(), direct.splits_considered());
    assert_eq!(folded.summaries(), direct.summaries());

    let de = Bitset::from_indices([3, 4]);
    assert_eq!(render_split_reversed(&de, taxa.len(), '*', '.'), "...**");
    assert_eq!(folded.split_occurrence(&de), 2);
}
