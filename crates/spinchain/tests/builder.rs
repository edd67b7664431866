use spinchain::{
    models::{heisenberg, ising},
    HamiltonianBuilder, InvalidTermError, Lattice, ModelError, TermList,
};
use tn::{tensor::C64, Tensor3, MPS};

// (|↑↓⟩ - |↓↑⟩)/√2 written directly as a two-site MPS.
fn singlet() -> MPS {
    let s = 1.0 / 2.0_f64.sqrt();
    let mut a = Tensor3::zeros(1, 2, 2);
    a.set(0, 0, 0, C64::new(1.0, 0.0));
    a.set(0, 1, 1, C64::new(1.0, 0.0));
    let mut b = Tensor3::zeros(2, 2, 1);
    b.set(0, 1, 0, C64::new(s, 0.0));
    b.set(1, 0, 0, C64::new(-s, 0.0));
    let mut psi = MPS::product(&[2, 2], &[0, 0]).unwrap();
    psi.sites = vec![a, b];
    psi
}

#[test]
fn ising_bond_dimension_does_not_grow_with_length() {
    for n in [4, 8, 20] {
        let lat = Lattice::spin_chain(n, 2).unwrap();
        let h = HamiltonianBuilder::new(&lat).build(&ising(n, 1.0, 1.0)).unwrap();
        assert_eq!(h.max_bond_dim(), 3, "n = {}", n);
        assert_eq!(h.len(), n);
    }
}

#[test]
fn heisenberg_bond_dimension_is_five() {
    let lat = Lattice::spin_chain(10, 3).unwrap();
    let h = HamiltonianBuilder::new(&lat).build(&heisenberg(10, 1.0)).unwrap();
    assert_eq!(h.max_bond_dim(), 5);
    assert_eq!(h.site_dims(), vec![3; 10]);
}

#[test]
fn ising_energy_of_polarized_state() {
    let n = 6;
    let (j, h) = (0.7, 1.3);
    let lat = Lattice::spin_chain(n, 2).unwrap();
    let mpo = HamiltonianBuilder::new(&lat).build(&ising(n, j, h)).unwrap();

    let up = MPS::product(&lat.dims(), &[0; 6]).unwrap();
    let e = up.expectation(&mpo).unwrap();
    let expected = -j * (n as f64 - 1.0) * 0.25;
    assert!((e - expected).abs() < 1e-12, "E = {}", e);

    let neel = MPS::product(&lat.dims(), &[0, 1, 0, 1, 0, 1]).unwrap();
    let e = neel.expectation(&mpo).unwrap();
    assert!((e - (-expected)).abs() < 1e-12, "E = {}", e);
}

#[test]
fn heisenberg_singlet_and_triplet() {
    let lat = Lattice::spin_chain(2, 2).unwrap();
    let j = 1.5;
    let mpo = HamiltonianBuilder::new(&lat).build(&heisenberg(2, j)).unwrap();

    let e_singlet = singlet().expectation(&mpo).unwrap();
    assert!((e_singlet - 0.75 * j).abs() < 1e-12, "E = {}", e_singlet);

    let up = MPS::product(&[2, 2], &[0, 0]).unwrap();
    let e_triplet = up.expectation(&mpo).unwrap();
    assert!((e_triplet + 0.25 * j).abs() < 1e-12, "E = {}", e_triplet);
}

#[test]
fn sy_sy_needs_complex_entries() {
    let lat = Lattice::spin_chain(2, 2).unwrap();
    let mut terms = TermList::new();
    terms.two_site(1.0, "Sy", 1, "Sy", 2);
    let mpo = HamiltonianBuilder::new(&lat).build(&terms).unwrap();

    let has_imag = mpo.sites[0].data.iter().any(|v| v.im != 0.0);
    assert!(has_imag);
    let e = singlet().expectation(&mpo).unwrap();
    assert!((e + 0.25).abs() < 1e-12, "<SySy> = {}", e);
}

#[test]
fn operators_on_same_site_multiply() {
    let lat = Lattice::spin_chain(3, 2).unwrap();
    let mut terms = TermList::new();
    terms.add(2.0, &[("Sz", 2), ("Sz", 2)]);
    let mpo = HamiltonianBuilder::new(&lat).build(&terms).unwrap();
    let psi = MPS::product(&[2, 2, 2], &[1, 0, 1]).unwrap();
    assert!((psi.expectation(&mpo).unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn long_range_term_passes_identities() {
    let lat = Lattice::spin_chain(5, 2).unwrap();
    let mut terms = TermList::new();
    terms.two_site(1.0, "Sz", 1, "Sz", 5);
    let mpo = HamiltonianBuilder::new(&lat).build(&terms).unwrap();
    let aligned = MPS::product(&[2; 5], &[0, 1, 1, 1, 0]).unwrap();
    let anti = MPS::product(&[2; 5], &[0, 0, 0, 0, 1]).unwrap();
    assert!((aligned.expectation(&mpo).unwrap() - 0.25).abs() < 1e-12);
    assert!((anti.expectation(&mpo).unwrap() + 0.25).abs() < 1e-12);
}

#[test]
fn invalid_terms_are_rejected() {
    let lat = Lattice::spin_chain(4, 2).unwrap();
    let builder = HamiltonianBuilder::new(&lat);

    let mut t = TermList::new();
    t.one_site(1.0, "Sz", 0);
    assert!(matches!(
        builder.build(&t),
        Err(ModelError::InvalidTerm(InvalidTermError::SiteOutOfRange { site: 0, .. }))
    ));

    let mut t = TermList::new();
    t.two_site(1.0, "Sz", 4, "Sz", 5);
    assert!(matches!(
        builder.build(&t),
        Err(ModelError::InvalidTerm(InvalidTermError::SiteOutOfRange { site: 5, n: 4, .. }))
    ));

    let mut t = TermList::new();
    t.one_site(1.0, "Sw", 1);
    assert!(matches!(
        builder.build(&t),
        Err(ModelError::InvalidTerm(InvalidTermError::UnknownOperator { .. }))
    ));

    let spin_one = Lattice::spin_chain(4, 3).unwrap();
    let mut t = TermList::new();
    t.one_site(1.0, "X", 2);
    assert!(HamiltonianBuilder::new(&spin_one).build(&t).is_err());

    let mut t = TermList::new();
    t.add(1.0, &[]);
    assert!(matches!(
        builder.build(&t),
        Err(ModelError::InvalidTerm(InvalidTermError::Empty { term: 0 }))
    ));
}
